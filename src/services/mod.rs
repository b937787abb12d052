//! 业务能力层（Services Layer）
//!
//! 不发起任何网络请求的本地能力：标注、地图、提示词与坐标解析、报告输出。

pub mod annotation;
pub mod geo_map;
pub mod narrative;
pub mod report;

pub use annotation::Annotator;
pub use geo_map::build_map;
pub use report::{ReportPaths, ReportWriter};
