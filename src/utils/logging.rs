//! 日志工具模块
//!
//! 提供批量分析过程中的日志格式化和输出辅助函数
use std::path::Path;
use tracing::info;

use crate::config::Config;

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 图片核验模式");
    info!("📊 最大并发数: {}", config.max_concurrent_images);
    info!(
        "⚙️ 执行模式: {:?}，OCR 策略: {:?}",
        config.execution_mode, config.ocr_policy
    );
    info!("{}", "=".repeat(60));
}

/// 记录图片加载信息
///
/// # 参数
/// - `total`: 图片总数
/// - `max_concurrent`: 最大并发数
pub fn log_images_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 共 {} 张待分析的图片", total);
    info!("📋 将以每批 {} 张的方式处理", max_concurrent);
}

/// 记录批次开始信息
pub fn log_batch_start(
    batch_num: usize,
    total_batches: usize,
    start: usize,
    end: usize,
    total: usize,
) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批图片: {}-{} / 共 {} 张", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, success: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 第 {} 批完成: 成功 {}/{}", batch_num, success, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功生成报告的图片数量
/// - `degraded`: 其中有远程调用失败的数量
/// - `failed`: 失败数量
/// - `total`: 总数
/// - `output_dir`: 报告目录
pub fn print_final_stats(
    success: usize,
    degraded: usize,
    failed: usize,
    total: usize,
    output_dir: &Path,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    if degraded > 0 {
        info!("⚠️ 部分分析失败: {}", degraded);
    }
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    info!("\n报告已保存至: {}", output_dir.display());
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
