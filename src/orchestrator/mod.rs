//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和并发调度，只做调度和统计，不做具体业务判断。
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<PathBuf>)
//!     ↓
//! workflow::AnalysisFlow (处理单张图片)
//!     ↓
//! clients (远程服务：vision / narrative)   services (本地能力：annotation / geo_map / report)
//! ```

pub mod batch_processor;

pub use batch_processor::{App, ProcessingStats};
