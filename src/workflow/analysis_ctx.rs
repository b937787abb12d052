//! 图片分析上下文
//!
//! 封装"我正在分析第几张图片、叫什么"这一信息，只用于日志和报告命名

use std::fmt::Display;
use std::path::Path;

/// 图片分析上下文
#[derive(Debug, Clone)]
pub struct AnalysisCtx {
    /// 图片序号（从1开始，仅用于日志显示）
    pub image_index: usize,

    /// 图片名称（不含扩展名）
    pub image_name: String,
}

impl AnalysisCtx {
    /// 创建新的分析上下文
    pub fn new(image_index: usize, image_name: impl Into<String>) -> Self {
        Self {
            image_index,
            image_name: image_name.into(),
        }
    }

    /// 从图片路径创建
    pub fn from_path(image_index: usize, path: &Path) -> Self {
        let image_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .filter(|stem| !stem.is_empty())
            .unwrap_or_else(|| format!("image_{}", image_index));
        Self::new(image_index, image_name)
    }

    /// 报告文件名前缀，带序号，同名图片不会互相覆盖
    pub fn report_name(&self) -> String {
        format!("{:03}_{}", self.image_index, self.image_name)
    }
}

impl Display for AnalysisCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[图片 #{} {}]", self.image_index, self.image_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        let ctx = AnalysisCtx::from_path(3, Path::new("/tmp/uploads/eiffel.jpg"));
        assert_eq!(ctx.image_name, "eiffel");
        assert_eq!(ctx.to_string(), "[图片 #3 eiffel]");

        let ctx = AnalysisCtx::from_path(2, Path::new("/"));
        assert_eq!(ctx.image_name, "image_2");
    }

    #[test]
    fn test_report_name_unique_per_index() {
        let first = AnalysisCtx::from_path(1, Path::new("a/photo.png"));
        let second = AnalysisCtx::from_path(2, Path::new("b/photo.jpg"));
        assert_eq!(first.report_name(), "001_photo");
        assert_ne!(first.report_name(), second.report_name());
    }
}
