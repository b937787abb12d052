//! 批量图片处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量图片的分析和报告输出。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：根据配置和凭据创建客户端、分析流程和报告写入器
//! 2. **并发控制**：使用 Semaphore 限制同时分析的图片数量
//! 3. **分批处理**：每批完成后再开始下一批
//! 4. **错误隔离**：单张图片失败只计入统计，不中断整个批次
//! 5. **全局统计**：汇总所有图片的处理结果

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::Credentials;
use crate::services::{ReportPaths, ReportWriter};
use crate::utils::logging::{
    log_batch_complete, log_batch_start, log_images_loaded, log_startup, print_final_stats,
};
use crate::workflow::{AnalysisCtx, AnalysisFlow};

/// 应用主结构
pub struct App {
    config: Config,
    flow: Arc<AnalysisFlow>,
    writer: Arc<ReportWriter>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config, credentials: Credentials) -> Result<Self> {
        log_startup(&config);

        let flow = AnalysisFlow::from_credentials(&config, &credentials)
            .context("创建分析流程失败")?;
        let writer = ReportWriter::new(&config.output_dir).context("创建报告写入器失败")?;

        Ok(Self::new(config, flow, writer))
    }

    /// 使用已构建好的流程创建（便于替换服务实现）
    pub fn new(config: Config, flow: AnalysisFlow, writer: ReportWriter) -> Self {
        Self {
            config,
            flow: Arc::new(flow),
            writer: Arc::new(writer),
        }
    }

    /// 运行应用主逻辑
    pub async fn run(&self, image_paths: Vec<PathBuf>) -> Result<ProcessingStats> {
        if image_paths.is_empty() {
            warn!("⚠️ 没有待分析的图片，程序结束");
            return Ok(ProcessingStats::default());
        }

        let max_concurrent = self.config.max_concurrent_images.max(1);
        log_images_loaded(image_paths.len(), max_concurrent);

        let stats = self.process_all_images(image_paths, max_concurrent).await?;

        print_final_stats(
            stats.success,
            stats.degraded,
            stats.failed,
            stats.total,
            &self.config.output_dir,
        );

        Ok(stats)
    }

    /// 分批处理所有图片
    async fn process_all_images(
        &self,
        image_paths: Vec<PathBuf>,
        max_concurrent: usize,
    ) -> Result<ProcessingStats> {
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let total_images = image_paths.len();
        let total_batches = total_images.div_ceil(max_concurrent);
        let mut stats = ProcessingStats {
            total: total_images,
            ..Default::default()
        };

        for (batch_idx, batch) in image_paths.chunks(max_concurrent).enumerate() {
            let batch_start = batch_idx * max_concurrent;
            let batch_num = batch_idx + 1;

            log_batch_start(
                batch_num,
                total_batches,
                batch_start + 1,
                batch_start + batch.len(),
                total_images,
            );

            let batch_result = self
                .process_batch(batch, batch_start, semaphore.clone())
                .await?;

            stats.success += batch_result.success;
            stats.degraded += batch_result.degraded;
            stats.failed += batch_result.failed;
            stats.reports.extend(batch_result.reports);

            log_batch_complete(
                batch_num,
                batch_result.success,
                batch_result.success + batch_result.failed,
            );
        }

        Ok(stats)
    }

    /// 处理单个批次
    async fn process_batch(
        &self,
        batch: &[PathBuf],
        batch_start: usize,
        semaphore: Arc<Semaphore>,
    ) -> Result<BatchResult> {
        let mut handles = Vec::new();

        for (idx, path) in batch.iter().enumerate() {
            let ctx = AnalysisCtx::from_path(batch_start + idx + 1, path);
            let permit = semaphore.clone().acquire_owned().await?;

            let flow = self.flow.clone();
            let writer = self.writer.clone();
            let path = path.clone();
            let task_ctx = ctx.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                process_image(&flow, &writer, &task_ctx, path).await
            });
            handles.push((ctx, handle));
        }

        let outcomes = join_all(
            handles
                .into_iter()
                .map(|(ctx, handle)| async move { (ctx, handle.await) }),
        )
        .await;

        let mut result = BatchResult::default();

        for (ctx, outcome) in outcomes {
            match outcome {
                Ok(Ok(outcome)) => {
                    result.success += 1;
                    if outcome.failed_calls > 0 {
                        result.degraded += 1;
                    }
                    result.reports.push(outcome.paths);
                }
                Ok(Err(e)) => {
                    error!("{} ❌ 处理过程中发生错误: {:#}", ctx, e);
                    result.failed += 1;
                }
                Err(e) => {
                    error!("{} 任务执行失败: {}", ctx, e);
                    result.failed += 1;
                }
            }
        }

        Ok(result)
    }
}

/// 单张图片的处理结果
struct ImageOutcome {
    paths: ReportPaths,
    failed_calls: usize,
}

/// 读取、分析并写出报告
async fn process_image(
    flow: &AnalysisFlow,
    writer: &ReportWriter,
    ctx: &AnalysisCtx,
    path: PathBuf,
) -> Result<ImageOutcome> {
    let image_bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("读取图片失败: {}", path.display()))?;

    let result = flow.run(image_bytes.clone(), ctx).await?;
    let paths = writer.write(ctx, &image_bytes, &result).await?;

    info!("{} ✅ 完成", ctx);

    Ok(ImageOutcome {
        paths,
        failed_calls: result.failed_calls(),
    })
}

/// 处理统计
#[derive(Debug, Default)]
pub struct ProcessingStats {
    /// 成功生成报告的图片数量
    pub success: usize,
    /// 报告已生成但有远程调用失败的图片数量
    pub degraded: usize,
    pub failed: usize,
    pub total: usize,
    pub reports: Vec<ReportPaths>,
}

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    success: usize,
    degraded: usize,
    failed: usize,
    reports: Vec<ReportPaths>,
}
