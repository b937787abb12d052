//! 流程层（Workflow Layer）
//!
//! 定义"一张图片"的完整分析流程，不关心批量和并发调度。

pub mod analysis_ctx;
pub mod analysis_flow;

pub use analysis_ctx::AnalysisCtx;
pub use analysis_flow::{analyze, AnalysisFlow, AnalysisOptions};
