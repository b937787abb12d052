//! # Verification Dashboard
//!
//! 图片核验工具：对一张图片并行发起多种视觉分析，汇总为一份报告
//!
//! ## 架构设计
//!
//! 本系统沿用分层架构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 持有远程服务连接，只暴露能力
//! - `VisionClient` - 地标 / 商标 / 物体 / 网络实体 / OCR
//! - `NarrativeClient` - 视觉语言模型叙述描述
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 不发起网络请求的本地能力
//! - `Annotator` - 边界框标注
//! - `build_map` / `GeoMap` - 地标地图
//! - `narrative` - 提示词与坐标提取
//! - `ReportWriter` - JSON / HTML 报告
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一张图片"的完整分析流程
//! - `AnalysisCtx` - 上下文封装（序号 + 名称）
//! - `AnalysisFlow` - 流程编排（地标 → 商标 → 物体 → 网络 → OCR → 叙述）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量处理器，管理并发和统计
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, ExecutionMode, OcrPolicy};
pub use error::{AppError, AppResult};
pub use models::{AggregateResult, Credentials};
pub use orchestrator::App;
pub use workflow::{analyze, AnalysisCtx, AnalysisFlow, AnalysisOptions};
