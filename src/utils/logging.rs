/// 日志工具模块
///
/// 提供日志初始化、运行统计输出和日志文件写入的辅助函数
use anyhow::Result;
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::engine::report::RunReport;

/// 错误信息在终端最多展示的条数，超出部分折叠（内部计数保持精确）
const MAX_DISPLAYED_ERRORS: usize = 5;

/// 初始化全局日志订阅器
///
/// 默认级别 info，可通过 RUST_LOG 覆盖。重复调用安全（测试场景）。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量标签生成模式");
    info!("📊 并发上限: {}", config.max_concurrency);
    info!(
        "📐 模式阈值: 顺序 ≤ {} / 并发 ≤ {} / 批量 > {}",
        config.sync_threshold, config.concurrent_threshold, config.concurrent_threshold
    );
    info!("{}", "=".repeat(60));
}

/// 记录加载结果
pub fn log_records_loaded(file_count: usize, record_count: usize) {
    info!("✓ 找到 {} 个记录文件，共 {} 条记录", file_count, record_count);
}

/// 打印最终统计信息
///
/// 错误信息只展示前几条，完整列表写入日志文件。
pub fn print_final_stats(report: &RunReport, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", report.success_count, report.total());
    info!("❌ 失败: {}", report.failure_count);
    for err in report.errors.iter().take(MAX_DISPLAYED_ERRORS) {
        info!("  - {}", err);
    }
    if report.errors.len() > MAX_DISPLAYED_ERRORS {
        info!("  ... 另有 {} 条错误", report.errors.len() - MAX_DISPLAYED_ERRORS);
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 将运行报告写入纯文本日志文件
pub fn write_run_log(log_file_path: &str, report: &RunReport) -> Result<()> {
    let mut content = format!(
        "{}\n标签生成日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    content.push_str(&format!(
        "成功: {}\n失败: {}\n\n",
        report.success_count, report.failure_count
    ));
    for err in &report.errors {
        content.push_str(err);
        content.push('\n');
    }
    fs::write(log_file_path, content)?;
    Ok(())
}
