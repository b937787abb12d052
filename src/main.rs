use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use verification_dash::{logger, App, Config, Credentials, ExecutionMode, OcrPolicy};

/// The Verification Dashboard 命令行
#[derive(Debug, Parser)]
#[command(name = "verification-dash", version, about = "对图片进行地标、商标、物体、网络匹配、OCR 和叙述分析")]
struct Cli {
    /// 凭据文件（JSON）
    #[arg(long, env = "VERIFY_CREDENTIALS")]
    credentials: PathBuf,

    /// 报告输出目录
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// 同时发起所有分析调用
    #[arg(long)]
    concurrent: bool,

    /// 无论网络检测结果如何都执行 OCR
    #[arg(long)]
    ocr_always: bool,

    /// 待分析的图片
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logger::init();

    let cli = Cli::parse();

    // 加载配置，命令行参数优先
    let mut config = Config::load().context("加载配置失败")?;
    if let Some(output_dir) = cli.output_dir {
        config.output_dir = output_dir;
    }
    if cli.concurrent {
        config.execution_mode = ExecutionMode::Concurrent;
    }
    if cli.ocr_always {
        config.ocr_policy = OcrPolicy::Always;
    }

    let credentials = Credentials::load(&cli.credentials)
        .await
        .with_context(|| format!("加载凭据失败: {}", cli.credentials.display()))?;
    info!("🔑 凭据已加载: {}", cli.credentials.display());

    // 初始化并运行应用
    let stats = App::initialize(config, credentials)
        .await?
        .run(cli.images)
        .await?;

    if stats.success == 0 && stats.total > 0 {
        anyhow::bail!("全部 {} 张图片处理失败", stats.total);
    }

    Ok(())
}
