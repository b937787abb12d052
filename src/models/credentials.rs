//! 外部服务凭据
//!
//! 凭据文件沿用仪表盘上传的 JSON 格式：
//!
//! ```json
//! {
//!   "openai_api_key": "sk-...",
//!   "vision_api_key": "AIza..."
//! }
//! ```
//!
//! `vision_api_key` 与 `vision_access_token` 二选一。Google 服务账号密钥文件
//! （`"type": "service_account"`）不做令牌交换，会直接报错。

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// 视觉分析服务凭据
#[derive(Clone)]
pub enum VisionCredentials {
    /// 以 `key=` 查询参数传递的 API Key
    ApiKey(String),
    /// OAuth Bearer 访问令牌
    AccessToken(String),
}

impl std::fmt::Debug for VisionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisionCredentials::ApiKey(_) => f.write_str("VisionCredentials::ApiKey(***)"),
            VisionCredentials::AccessToken(_) => f.write_str("VisionCredentials::AccessToken(***)"),
        }
    }
}

/// 叙述描述服务凭据（OpenAI 兼容接口）
#[derive(Clone)]
pub struct NarrativeCredentials {
    pub api_key: String,
    /// 自定义 API 地址，为空时使用配置中的默认地址
    pub api_base: Option<String>,
}

impl std::fmt::Debug for NarrativeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeCredentials")
            .field("api_key", &"***")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// 凭据文件原始结构
#[derive(Debug, Default, Deserialize)]
struct CredentialsFile {
    openai_api_key: Option<String>,
    openai_api_base: Option<String>,
    vision_api_key: Option<String>,
    vision_access_token: Option<String>,
    #[serde(rename = "type")]
    account_type: Option<String>,
}

/// 两组独立凭据
#[derive(Debug, Clone)]
pub struct Credentials {
    pub vision: VisionCredentials,
    pub narrative: NarrativeCredentials,
}

impl Credentials {
    /// 从 JSON 文本解析凭据
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let file: CredentialsFile = serde_json::from_str(content)?;

        let vision = match (non_empty(file.vision_api_key), non_empty(file.vision_access_token)) {
            (Some(key), _) => VisionCredentials::ApiKey(key),
            (None, Some(token)) => VisionCredentials::AccessToken(token),
            (None, None) => {
                return Err(match non_empty(file.account_type) {
                    Some(kind) => ConfigError::UnsupportedCredentials { kind },
                    None => ConfigError::MissingField {
                        field: "vision_api_key | vision_access_token".to_string(),
                    },
                })
            }
        };

        let api_key = non_empty(file.openai_api_key).ok_or_else(|| ConfigError::MissingField {
            field: "openai_api_key".to_string(),
        })?;

        Ok(Self {
            vision,
            narrative: NarrativeCredentials {
                api_key,
                api_base: non_empty(file.openai_api_base),
            },
        })
    }

    /// 从文件加载凭据
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::FileRead {
                    path: path.display().to_string(),
                    source,
                })?;
        Self::from_json(&content)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_key_credentials() {
        let credentials = Credentials::from_json(
            r#"{"openai_api_key": "sk-test", "vision_api_key": "AIza-test", "type": "service_account"}"#,
        )
        .unwrap();

        assert!(matches!(credentials.vision, VisionCredentials::ApiKey(ref k) if k == "AIza-test"));
        assert_eq!(credentials.narrative.api_key, "sk-test");
        assert!(credentials.narrative.api_base.is_none());
    }

    #[test]
    fn test_parse_access_token_credentials() {
        let credentials = Credentials::from_json(
            r#"{"openai_api_key": "sk-test", "openai_api_base": "http://localhost:8080/v1", "vision_access_token": "ya29.token"}"#,
        )
        .unwrap();

        assert!(matches!(credentials.vision, VisionCredentials::AccessToken(_)));
        assert_eq!(
            credentials.narrative.api_base.as_deref(),
            Some("http://localhost:8080/v1")
        );
    }

    #[test]
    fn test_missing_fields() {
        let err = Credentials::from_json(r#"{"vision_api_key": "k"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { ref field } if field == "openai_api_key"));

        let err = Credentials::from_json(r#"{"openai_api_key": "k", "vision_api_key": "  "}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { .. }));
    }

    #[test]
    fn test_service_account_file_rejected() {
        let err = Credentials::from_json(
            r#"{"type": "service_account", "client_email": "bot@project.iam.gserviceaccount.com", "openai_api_key": "sk-test"}"#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::UnsupportedCredentials { ref kind } if kind == "service_account"));
        let message = err.to_string();
        assert!(message.contains("service_account"));
        assert!(message.contains("vision_api_key"));
    }

    #[test]
    fn test_invalid_json() {
        let err = Credentials::from_json("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidJson(_)));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let credentials =
            Credentials::from_json(r#"{"openai_api_key": "sk-secret", "vision_api_key": "AIza-secret"}"#)
                .unwrap();
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("secret"));
    }
}
