use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;

/// OCR 触发策略
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrPolicy {
    /// 只有网络检测返回了实体、匹配页面或相似图片时才执行 OCR
    WebMatchGated,
    /// 总是执行 OCR
    Always,
}

/// 单张图片内远程调用的执行方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// 按固定顺序依次调用
    Sequential,
    /// 五个顶层调用并发执行，OCR 仍在网络检测之后
    Concurrent,
}

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 视觉分析服务 ---
    pub vision_api_base_url: String,
    // --- 叙述描述服务 ---
    pub narrative_api_base_url: String,
    pub narrative_model: String,
    pub narrative_max_tokens: u32,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    // --- 分析策略 ---
    pub ocr_policy: OcrPolicy,
    pub execution_mode: ExecutionMode,
    // --- 展示 ---
    /// 地图初始缩放级别
    pub map_zoom: u8,
    /// 标注文字使用的 TrueType 字体
    pub font_path: Option<PathBuf>,
    /// 报告输出目录
    pub output_dir: PathBuf,
    /// 同时处理的图片数量
    pub max_concurrent_images: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vision_api_base_url: "https://vision.googleapis.com".to_string(),
            narrative_api_base_url: "https://api.openai.com/v1".to_string(),
            narrative_model: "gpt-4o".to_string(),
            narrative_max_tokens: 1000,
            request_timeout_secs: 60,
            ocr_policy: OcrPolicy::WebMatchGated,
            execution_mode: ExecutionMode::Sequential,
            map_zoom: 15,
            font_path: None,
            output_dir: PathBuf::from("reports"),
            max_concurrent_images: 4,
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 若设置了 `VERIFY_CONFIG`，先读取该 TOML 文件，再叠加其余环境变量。
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var("VERIFY_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_toml_file(Path::new(&path))?,
            _ => Self::default(),
        };
        base.with_env_overrides()
    }

    /// 默认配置叠加 `VERIFY_*` 环境变量，无法解析的值返回 `InvalidValue`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载配置，缺失字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    fn with_env_overrides(self) -> Result<Self, ConfigError> {
        let base = self;
        Ok(Self {
            vision_api_base_url: env_parse("VERIFY_VISION_API_BASE_URL")?.unwrap_or(base.vision_api_base_url),
            narrative_api_base_url: env_parse("VERIFY_NARRATIVE_API_BASE_URL")?.unwrap_or(base.narrative_api_base_url),
            narrative_model: env_parse("VERIFY_NARRATIVE_MODEL")?.unwrap_or(base.narrative_model),
            narrative_max_tokens: env_parse("VERIFY_NARRATIVE_MAX_TOKENS")?.unwrap_or(base.narrative_max_tokens),
            request_timeout_secs: env_parse("VERIFY_REQUEST_TIMEOUT_SECS")?.unwrap_or(base.request_timeout_secs),
            ocr_policy: env_parse::<bool>("VERIFY_OCR_ALWAYS")?.map(|always| if always { OcrPolicy::Always } else { OcrPolicy::WebMatchGated }).unwrap_or(base.ocr_policy),
            execution_mode: env_parse::<bool>("VERIFY_CONCURRENT")?.map(|c| if c { ExecutionMode::Concurrent } else { ExecutionMode::Sequential }).unwrap_or(base.execution_mode),
            map_zoom: env_parse("VERIFY_MAP_ZOOM")?.unwrap_or(base.map_zoom),
            font_path: env_parse::<PathBuf>("VERIFY_FONT_PATH")?.or(base.font_path),
            output_dir: env_parse("VERIFY_OUTPUT_DIR")?.unwrap_or(base.output_dir),
            max_concurrent_images: env_parse("VERIFY_MAX_CONCURRENT_IMAGES")?.unwrap_or(base.max_concurrent_images),
        })
    }
}

/// 读取并解析环境变量，未设置或为空时返回 None
fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue {
                    field: name.to_string(),
                    value,
                })
        }
        _ => Ok(None),
    }
}
