//! 外部服务客户端 - 基础设施层
//!
//! 只暴露"调用远程服务"的能力，不关心流程顺序和结果展示。
//! 流程层只依赖这里的两个 trait，测试中可以替换为模拟实现。

pub mod narrative_client;
pub mod vision_client;

use async_trait::async_trait;

use crate::error::{AnalysisCallError, NarrativeCallError};
use crate::models::{AnalysisKind, AnnotateImageResponse, ImagePayload};

pub use narrative_client::NarrativeClient;
pub use vision_client::VisionClient;

/// 视觉分析服务
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// 对图片执行一种分析，返回该图片的标注结果
    async fn annotate(
        &self,
        image: &ImagePayload,
        kind: AnalysisKind,
    ) -> Result<AnnotateImageResponse, AnalysisCallError>;
}

/// 叙述描述服务（视觉语言模型）
#[async_trait]
pub trait NarrativeDescriber: Send + Sync {
    /// 根据图片和提示词生成描述文本
    async fn describe(
        &self,
        image: &ImagePayload,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, NarrativeCallError>;
}
