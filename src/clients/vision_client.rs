//! Cloud Vision API 客户端
//!
//! 封装 `images:annotate` 调用，每次请求只携带一个 feature。
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::clients::VisionAnalyzer;
use crate::config::Config;
use crate::error::{AnalysisCallError, AppError, AppResult};
use crate::models::vision_response::{
    AnnotateImageRequest, BatchAnnotateRequest, BatchAnnotateResponse, Feature, ImageContent,
};
use crate::models::{AnalysisKind, AnnotateImageResponse, ImagePayload, VisionCredentials};

/// gRPC RESOURCE_EXHAUSTED
const RESOURCE_EXHAUSTED: i32 = 8;

/// 视觉分析客户端
pub struct VisionClient {
    http: reqwest::Client,
    base_url: String,
    credentials: VisionCredentials,
}

impl VisionClient {
    /// 创建新的视觉分析客户端
    pub fn new(config: &Config, credentials: VisionCredentials) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::client("vision", e))?;

        Ok(Self {
            http,
            base_url: config.vision_api_base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/images:annotate", self.base_url)
    }

    fn build_request(image: &ImagePayload, kind: AnalysisKind) -> BatchAnnotateRequest {
        BatchAnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent {
                    content: image.base64().to_string(),
                },
                features: vec![Feature {
                    feature_type: kind.feature_type().to_string(),
                }],
            }],
        }
    }
}

#[async_trait]
impl VisionAnalyzer for VisionClient {
    async fn annotate(
        &self,
        image: &ImagePayload,
        kind: AnalysisKind,
    ) -> Result<AnnotateImageResponse, AnalysisCallError> {
        debug!("调用 Vision API: {}", kind.feature_type());

        let body = Self::build_request(image, kind);
        let request = self.http.post(self.endpoint()).json(&body);
        let request = match &self.credentials {
            VisionCredentials::ApiKey(key) => request.query(&[("key", key.as_str())]),
            VisionCredentials::AccessToken(token) => request.bearer_auth(token),
        };

        let response = request
            .send()
            .await
            .map_err(|e| AnalysisCallError::Transport {
                kind,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Vision API 返回错误状态 {} ({})", status, kind);
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(AnalysisCallError::QuotaExceeded {
                    kind,
                    message: body,
                });
            }
            return Err(AnalysisCallError::BadStatus {
                kind,
                status: status.as_u16(),
                body,
            });
        }

        let batch: BatchAnnotateResponse =
            response
                .json()
                .await
                .map_err(|e| AnalysisCallError::InvalidResponse {
                    kind,
                    message: e.to_string(),
                })?;

        let single = batch.responses.into_iter().next().unwrap_or_default();
        check_image_error(&single, kind)?;

        debug!("Vision API 调用成功: {}", kind.feature_type());
        Ok(single)
    }
}

/// 单张图片级别的错误（HTTP 200 但响应体中带 error）
fn check_image_error(
    response: &AnnotateImageResponse,
    kind: AnalysisKind,
) -> Result<(), AnalysisCallError> {
    match &response.error {
        Some(status) if status.code == RESOURCE_EXHAUSTED => Err(AnalysisCallError::QuotaExceeded {
            kind,
            message: status.message.clone(),
        }),
        Some(status) if status.code != 0 => Err(AnalysisCallError::Service {
            kind,
            code: status.code,
            message: status.message.clone(),
        }),
        _ => Ok(()),
    }
}
