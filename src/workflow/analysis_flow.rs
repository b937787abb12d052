//! 图片分析流程 - 流程层
//!
//! 核心职责：定义"一张图片"的完整分析流程
//!
//! 流程顺序：
//! 1. 地标识别 → 地图
//! 2. 商标识别
//! 3. 物体定位 → 边界框标注
//! 4. 网络实体检测 → （有匹配时）OCR
//! 5. 叙述描述（独立服务，无论前面成败都会执行）
//!
//! 每个远程调用各自捕获错误，写入 AggregateResult 中对应的字段，
//! 只有空图片这种本地前置条件错误会返回 Err。

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clients::{NarrativeClient, NarrativeDescriber, VisionAnalyzer, VisionClient};
use crate::config::{Config, ExecutionMode, OcrPolicy};
use crate::error::{AnalysisCallError, AppResult, DecodeError, NarrativeCallError};
use crate::models::{
    AggregateResult, AnalysisKind, AnnotateImageResponse, AnnotatedImage, Credentials,
    DetectedObject, ImagePayload, Landmark, Logo, NarrativeCredentials, NarrativeDescription,
    OcrOutcome, VisionCredentials, WebMatchResult,
};
use crate::services::annotation::Annotator;
use crate::services::geo_map::build_map;
use crate::services::narrative::{self, NARRATIVE_PROMPT};
use crate::utils::truncate_text;
use crate::workflow::analysis_ctx::AnalysisCtx;

/// 分析策略
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    pub ocr_policy: OcrPolicy,
    pub execution_mode: ExecutionMode,
    pub map_zoom: u8,
    pub narrative_max_tokens: u32,
}

impl AnalysisOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ocr_policy: config.ocr_policy,
            execution_mode: config.execution_mode,
            map_zoom: config.map_zoom,
            narrative_max_tokens: config.narrative_max_tokens,
        }
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// 图片分析流程
///
/// - 编排六个远程调用并隔离各自的失败
/// - 不持有任何跨请求的状态
/// - 只依赖 clients 暴露的两个 trait
pub struct AnalysisFlow {
    vision: Arc<dyn VisionAnalyzer>,
    narrative: Arc<dyn NarrativeDescriber>,
    annotator: Arc<Annotator>,
    options: AnalysisOptions,
}

impl AnalysisFlow {
    /// 创建新的图片分析流程
    pub fn new(
        vision: Arc<dyn VisionAnalyzer>,
        narrative: Arc<dyn NarrativeDescriber>,
        annotator: Arc<Annotator>,
        options: AnalysisOptions,
    ) -> Self {
        Self {
            vision,
            narrative,
            annotator,
            options,
        }
    }

    /// 使用真实服务客户端创建
    pub fn from_credentials(config: &Config, credentials: &Credentials) -> AppResult<Self> {
        Self::with_clients(config, &credentials.vision, &credentials.narrative)
    }

    fn with_clients(
        config: &Config,
        vision_credentials: &VisionCredentials,
        narrative_credentials: &NarrativeCredentials,
    ) -> AppResult<Self> {
        let vision = VisionClient::new(config, vision_credentials.clone())?;
        let narrative = NarrativeClient::new(config, narrative_credentials);
        let annotator = Annotator::with_font_file(config.font_path.as_deref());

        Ok(Self::new(
            Arc::new(vision),
            Arc::new(narrative),
            Arc::new(annotator),
            AnalysisOptions::from_config(config),
        ))
    }

    /// 分析一张图片
    ///
    /// 空图片在发起任何远程调用之前返回 `DecodeError::Empty`；
    /// 其余错误都记录在结果的对应字段中。
    pub async fn run(
        &self,
        image_bytes: Vec<u8>,
        ctx: &AnalysisCtx,
    ) -> Result<AggregateResult, DecodeError> {
        let payload = ImagePayload::new(image_bytes)?;

        info!(
            "{} 🔍 开始分析 ({} 字节, {})",
            ctx,
            payload.bytes().len(),
            payload.mime_type()
        );

        let result = match self.options.execution_mode {
            ExecutionMode::Sequential => {
                let landmarks = self.detect_landmarks(&payload, ctx).await;
                let logos = self.detect_logos(&payload, ctx).await;
                let objects = self.detect_objects(&payload, ctx).await;
                let (web, ocr) = self.detect_web_and_text(&payload, ctx).await;
                let narrative = self.describe(&payload, ctx).await;
                self.assemble(&payload, landmarks, logos, objects, web, ocr, narrative)
                    .await
            }
            ExecutionMode::Concurrent => {
                let (landmarks, logos, objects, (web, ocr), narrative) = tokio::join!(
                    self.detect_landmarks(&payload, ctx),
                    self.detect_logos(&payload, ctx),
                    self.detect_objects(&payload, ctx),
                    self.detect_web_and_text(&payload, ctx),
                    self.describe(&payload, ctx),
                );
                self.assemble(&payload, landmarks, logos, objects, web, ocr, narrative)
                    .await
            }
        };

        let failed = result.failed_calls();
        if failed > 0 {
            warn!("{} ⚠️ 分析完成，{} 个调用失败", ctx, failed);
        } else {
            info!("{} ✓ 分析完成", ctx);
        }

        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    async fn assemble(
        &self,
        payload: &ImagePayload,
        landmarks: Result<Vec<Landmark>, AnalysisCallError>,
        logos: Result<Vec<Logo>, AnalysisCallError>,
        objects: Result<Vec<DetectedObject>, AnalysisCallError>,
        web: Result<WebMatchResult, AnalysisCallError>,
        ocr: OcrOutcome,
        narrative: Result<NarrativeDescription, NarrativeCallError>,
    ) -> AggregateResult {
        let map = landmarks
            .as_ref()
            .ok()
            .and_then(|landmarks| build_map(landmarks, self.options.map_zoom));

        // 标注失败不影响物体的文本数据
        let annotation = match &objects {
            Ok(objects) if !objects.is_empty() => {
                let annotated = self.annotate(payload, objects).await;
                if let Err(e) = &annotated {
                    warn!("❌ 无法加载图片进行物体标注: {}", e);
                }
                Some(annotated)
            }
            _ => None,
        };

        AggregateResult {
            landmarks,
            logos,
            objects,
            annotation,
            web,
            ocr,
            narrative,
            map,
        }
    }

    /// 解码和绘制在阻塞线程池上执行
    async fn annotate(
        &self,
        payload: &ImagePayload,
        objects: &[DetectedObject],
    ) -> Result<AnnotatedImage, DecodeError> {
        let annotator = self.annotator.clone();
        let image_bytes = payload.bytes().to_vec();
        let objects = objects.to_vec();

        tokio::task::spawn_blocking(move || annotator.annotate(&image_bytes, &objects))
            .await
            .unwrap_or_else(|e| {
                Err(DecodeError::Malformed {
                    message: format!("标注任务异常退出: {}", e),
                })
            })
    }

    /// 单次视觉调用的错误边界
    async fn call_vision(
        &self,
        payload: &ImagePayload,
        kind: AnalysisKind,
        ctx: &AnalysisCtx,
    ) -> Result<AnnotateImageResponse, AnalysisCallError> {
        debug!("{} 调用 {}", ctx, kind);
        self.vision.annotate(payload, kind).await.map_err(|e| {
            warn!("{} ❌ {}失败: {}", ctx, kind, e);
            e
        })
    }

    async fn detect_landmarks(
        &self,
        payload: &ImagePayload,
        ctx: &AnalysisCtx,
    ) -> Result<Vec<Landmark>, AnalysisCallError> {
        let landmarks = self
            .call_vision(payload, AnalysisKind::Landmark, ctx)
            .await?
            .landmarks();
        info!("{} 📍 识别到 {} 个地标", ctx, landmarks.len());
        Ok(landmarks)
    }

    async fn detect_logos(
        &self,
        payload: &ImagePayload,
        ctx: &AnalysisCtx,
    ) -> Result<Vec<Logo>, AnalysisCallError> {
        let logos = self
            .call_vision(payload, AnalysisKind::Logo, ctx)
            .await?
            .logos();
        info!("{} 👓 识别到 {} 个商标", ctx, logos.len());
        Ok(logos)
    }

    async fn detect_objects(
        &self,
        payload: &ImagePayload,
        ctx: &AnalysisCtx,
    ) -> Result<Vec<DetectedObject>, AnalysisCallError> {
        let objects = self
            .call_vision(payload, AnalysisKind::ObjectLocalization, ctx)
            .await?
            .objects();
        info!("{} 🧳 定位到 {} 个物体", ctx, objects.len());
        Ok(objects)
    }

    /// 网络检测，以及按策略决定是否继续 OCR
    async fn detect_web_and_text(
        &self,
        payload: &ImagePayload,
        ctx: &AnalysisCtx,
    ) -> (Result<WebMatchResult, AnalysisCallError>, OcrOutcome) {
        let web = self
            .call_vision(payload, AnalysisKind::WebDetection, ctx)
            .await
            .map(|response| response.web_matches());

        if let Ok(matches) = &web {
            info!(
                "{} 🌐 网络实体 {} 个，匹配页面 {} 个，相似图片 {} 个",
                ctx,
                matches.entities.len(),
                matches.matching_pages.len(),
                matches.similar_images.len()
            );
        }

        let run_ocr = match self.options.ocr_policy {
            OcrPolicy::Always => true,
            OcrPolicy::WebMatchGated => web.as_ref().is_ok_and(WebMatchResult::has_any_match),
        };

        if !run_ocr {
            info!("{} 跳过 OCR（网络检测无匹配）", ctx);
            return (web, OcrOutcome::Skipped);
        }

        let ocr = match self
            .call_vision(payload, AnalysisKind::TextDetection, ctx)
            .await
        {
            Ok(response) => match response.full_text() {
                Some(text) if !text.trim().is_empty() => {
                    info!("{} 📝 识别到文字 {} 字符", ctx, text.chars().count());
                    OcrOutcome::Text(text)
                }
                _ => OcrOutcome::NoText,
            },
            Err(e) => OcrOutcome::Failed(e),
        };

        (web, ocr)
    }

    async fn describe(
        &self,
        payload: &ImagePayload,
        ctx: &AnalysisCtx,
    ) -> Result<NarrativeDescription, NarrativeCallError> {
        match self
            .narrative
            .describe(payload, NARRATIVE_PROMPT, self.options.narrative_max_tokens)
            .await
        {
            Ok(text) => {
                debug!("{} 模型回答: {}", ctx, truncate_text(&text, 80));
                let description = narrative::to_description(text);
                info!(
                    "{} 🤖 叙述描述完成{}",
                    ctx,
                    if description.estimated_coordinates.is_some() {
                        "（含估计坐标）"
                    } else {
                        ""
                    }
                );
                Ok(description)
            }
            Err(e) => {
                warn!("{} ❌ 叙述描述失败: {}", ctx, e);
                Err(e)
            }
        }
    }
}

/// 使用两组凭据分析一张图片
///
/// 本地前置条件（空图片、客户端构建失败）之外的错误都不会从这里返回。
pub async fn analyze(
    image_bytes: Vec<u8>,
    vision_credentials: &VisionCredentials,
    narrative_credentials: &NarrativeCredentials,
    config: &Config,
) -> AppResult<AggregateResult> {
    let flow = AnalysisFlow::with_clients(config, vision_credentials, narrative_credentials)?;
    let ctx = AnalysisCtx::new(1, "image");
    Ok(flow.run(image_bytes, &ctx).await?)
}
