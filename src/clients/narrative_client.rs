//! 叙述描述客户端
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI Chat Completions 接口的服务均可使用

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, ImageDetail, ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::clients::NarrativeDescriber;
use crate::config::Config;
use crate::error::NarrativeCallError;
use crate::models::{ImagePayload, NarrativeCredentials};

/// 叙述描述客户端
pub struct NarrativeClient {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl NarrativeClient {
    /// 创建新的叙述描述客户端
    pub fn new(config: &Config, credentials: &NarrativeCredentials) -> Self {
        let api_base = credentials
            .api_base
            .as_deref()
            .unwrap_or(&config.narrative_api_base_url);

        let openai_config = OpenAIConfig::new()
            .with_api_key(&credentials.api_key)
            .with_api_base(api_base);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.narrative_model.clone(),
        }
    }

    /// 构建包含文本和图片两部分内容的请求
    fn build_request(
        &self,
        image: &ImagePayload,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<CreateChatCompletionRequest, NarrativeCallError> {
        let content_parts = vec![
            ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: prompt.to_string(),
                },
            ),
            ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: image.data_url(),
                        detail: Some(ImageDetail::Auto),
                    },
                },
            ),
        ];

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
            .build()
            .map_err(request_build_error)?;

        CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .max_tokens(max_tokens)
            .build()
            .map_err(request_build_error)
    }
}

fn request_build_error(err: impl std::fmt::Display) -> NarrativeCallError {
    NarrativeCallError::RequestBuild {
        message: err.to_string(),
    }
}

#[async_trait]
impl NarrativeDescriber for NarrativeClient {
    async fn describe(
        &self,
        image: &ImagePayload,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, NarrativeCallError> {
        debug!(
            "调用叙述描述 API，模型: {}，图片 {} 字节",
            self.model_name,
            image.bytes().len()
        );

        let request = self.build_request(image, prompt, max_tokens)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("叙述描述 API 调用失败: {}", e);
            NarrativeCallError::ApiCallFailed {
                model: self.model_name.clone(),
                message: e.to_string(),
            }
        })?;

        debug!("叙述描述 API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| NarrativeCallError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::test_server::serve_once;
    use crate::services::narrative::NARRATIVE_PROMPT;
    use serde_json::json;

    fn local_client(address: &str) -> NarrativeClient {
        let credentials = NarrativeCredentials {
            api_key: "sk-local".to_string(),
            api_base: Some(format!("{}/v1", address)),
        };
        NarrativeClient::new(&Config::default(), &credentials)
    }

    fn completion(choices: serde_json::Value) -> String {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4o",
            "choices": choices
        })
        .to_string()
    }

    fn choice(content: &str) -> serde_json::Value {
        json!({
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        })
    }

    fn create_test_client() -> NarrativeClient {
        let credentials = NarrativeCredentials {
            api_key: "sk-test".to_string(),
            api_base: Some("http://127.0.0.1:1/v1".to_string()),
        };
        NarrativeClient::new(&Config::default(), &credentials)
    }

    #[test]
    fn test_request_contains_prompt_image_and_token_limit() {
        let client = create_test_client();
        let payload = ImagePayload::new(b"fake-jpeg".to_vec()).unwrap();

        let request = client
            .build_request(&payload, NARRATIVE_PROMPT, 1000)
            .unwrap();
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["max_tokens"], 1000);
        let content = &value["messages"][0]["content"];
        assert_eq!(content[0]["text"], NARRATIVE_PROMPT);
        assert!(content[1]["image_url"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn test_describe_returns_trimmed_content() {
        let body = completion(json!([choice("  A tower in Paris.\nCoordinates: 48.85, 2.29 \n")]));
        let (address, server) = serve_once("200 OK", &body).await;

        let payload = ImagePayload::new(b"fake-jpeg".to_vec()).unwrap();
        let text = local_client(&address)
            .describe(&payload, NARRATIVE_PROMPT, 1000)
            .await
            .unwrap();
        assert_eq!(text, "A tower in Paris.\nCoordinates: 48.85, 2.29");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/chat/completions "));
        assert!(request.to_lowercase().contains("authorization: bearer sk-local"));
    }

    #[tokio::test]
    async fn test_no_choices_is_empty_content() {
        let (address, server) = serve_once("200 OK", &completion(json!([]))).await;

        let payload = ImagePayload::new(b"fake-jpeg".to_vec()).unwrap();
        let err = local_client(&address)
            .describe(&payload, NARRATIVE_PROMPT, 1000)
            .await
            .unwrap_err();
        assert!(matches!(err, NarrativeCallError::EmptyContent { ref model } if model == "gpt-4o"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_blank_content_is_empty_content() {
        let (address, server) = serve_once("200 OK", &completion(json!([choice("   ")]))).await;

        let payload = ImagePayload::new(b"fake-jpeg".to_vec()).unwrap();
        let err = local_client(&address)
            .describe(&payload, NARRATIVE_PROMPT, 1000)
            .await
            .unwrap_err();
        assert!(matches!(err, NarrativeCallError::EmptyContent { .. }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_api_error_is_call_failed() {
        let body = json!({
            "error": {
                "message": "Invalid image",
                "type": "invalid_request_error",
                "param": null,
                "code": null
            }
        })
        .to_string();
        let (address, server) = serve_once("400 Bad Request", &body).await;

        let payload = ImagePayload::new(b"fake-jpeg".to_vec()).unwrap();
        let err = local_client(&address)
            .describe(&payload, NARRATIVE_PROMPT, 1000)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NarrativeCallError::ApiCallFailed { ref message, .. } if message.contains("Invalid image")
        ));
        server.await.unwrap();
    }
}
