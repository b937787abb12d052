use serde::Serialize;
use thiserror::Error;

use crate::models::analysis::AnalysisKind;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 图片解码错误
    #[error("图片解码错误: {0}")]
    Decode(#[from] DecodeError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 客户端构建失败
    #[error("客户端构建失败 ({client}): {message}")]
    Client { client: String, message: String },
    /// 文件读写错误
    #[error("文件错误 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 报告渲染错误
    #[error("报告渲染失败: {0}")]
    Report(String),
}

/// 图片无法解码为位图
///
/// 只阻断标注步骤，不影响其它远程分析。
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecodeError {
    /// 图片字节为空
    #[error("图片内容为空")]
    Empty,
    /// 图片格式无法识别或数据损坏
    #[error("无法解码图片: {message}")]
    Malformed { message: String },
}

impl From<image::ImageError> for DecodeError {
    fn from(err: image::ImageError) -> Self {
        DecodeError::Malformed {
            message: err.to_string(),
        }
    }
}

/// 单次视觉分析调用失败
///
/// 只影响 AggregateResult 中对应的字段。
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisCallError {
    /// 网络请求失败
    #[error("{kind} 请求失败: {message}")]
    Transport { kind: AnalysisKind, message: String },
    /// 服务返回非成功状态码
    #[error("{kind} 返回错误状态 {status}: {body}")]
    BadStatus {
        kind: AnalysisKind,
        status: u16,
        body: String,
    },
    /// 配额耗尽或频率限制
    #[error("{kind} 配额不足或请求过于频繁: {message}")]
    QuotaExceeded { kind: AnalysisKind, message: String },
    /// 服务在单张图片的响应中返回了错误
    #[error("{kind} 服务错误 (code={code}): {message}")]
    Service {
        kind: AnalysisKind,
        code: i32,
        message: String,
    },
    /// 响应无法解析
    #[error("{kind} 响应解析失败: {message}")]
    InvalidResponse { kind: AnalysisKind, message: String },
}

/// 叙述描述服务调用失败
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NarrativeCallError {
    /// 请求构建失败
    #[error("请求构建失败: {message}")]
    RequestBuild { message: String },
    /// API 调用失败
    #[error("API 调用失败 (模型: {model}): {message}")]
    ApiCallFailed { model: String, message: String },
    /// 返回内容为空
    #[error("返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
}

/// 配置错误
///
/// 在调用 `analyze` 之前由上游识别。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// JSON 语法错误
    #[error("配置文件 JSON 语法错误: {0}")]
    InvalidJson(#[from] serde_json::Error),
    /// TOML 语法错误
    #[error("配置文件 TOML 语法错误: {0}")]
    InvalidToml(#[from] toml::de::Error),
    /// 缺少必填字段
    #[error("配置缺少必填字段: {field}")]
    MissingField { field: String },
    /// 字段值无效
    #[error("配置字段 {field} 的值 '{value}' 无效")]
    InvalidValue { field: String, value: String },
    /// 凭据类型不受支持
    #[error("不支持的凭据类型 '{kind}'，请在凭据文件中提供 vision_api_key 或 vision_access_token")]
    UnsupportedCredentials { kind: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读写错误
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// 创建客户端构建错误
    pub fn client(client: impl Into<String>, message: impl ToString) -> Self {
        AppError::Client {
            client: client.into(),
            message: message.to_string(),
        }
    }
}

impl From<tera::Error> for AppError {
    fn from(err: tera::Error) -> Self {
        AppError::Report(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Report(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Report(err.to_string())
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
