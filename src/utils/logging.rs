//! 日志工具模块
//!
//! 提供日志初始化和批处理过程中的格式化输出
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::orchestrator::ProcessingStats;

/// 初始化 tracing 订阅者
///
/// 优先使用 `RUST_LOG`；未设置时按 `verbose` 选择 debug / info 级别。
/// 重复初始化（例如测试中）时静默忽略。
pub fn init(verbose: bool) {
    let default_level = if verbose {
        "attendance_review=debug,info"
    } else {
        "info"
    };

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 考勤异常申请批量审核");
    info!("🤖 AI provider: {}", config.default_provider);
    info!("📊 最大并发数: {}", config.max_concurrent_applications);
    info!("{}", "=".repeat(60));
}

/// 记录申请加载信息
pub fn log_applications_loaded(total: usize, max_concurrent: usize) {
    info!("✓ 找到 {} 份待审核的申请", total);
    info!("📋 将以每批 {} 份的方式处理", max_concurrent);
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
    info!("📄 本批申请: {}-{} / 共 {} 份", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, stats: &ProcessingStats) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 第 {} 批完成: 正常 {} / 异常 {} / 出错 {}",
        batch_num, stats.normal, stats.abnormal, stats.failed
    );
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(stats: &ProcessingStats, output_file: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部审核完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 正常: {}/{}", stats.normal, stats.total);
    info!("⚠️ 异常: {}", stats.abnormal);
    info!("❌ 出错: {}", stats.failed);
    info!("{}", "=".repeat(60));
    info!("\n裁决结果已保存至: {}", output_file);
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
