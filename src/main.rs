use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use auto_labeler::config::Config;
use auto_labeler::engine::{LabelEngine, ProgressCallback, RunReport};
use auto_labeler::models::{load_all_record_files, save_record_file};
use auto_labeler::utils::logging;
use auto_labeler::utils::text::generate_tags_auto;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();
    logging::log_startup(&config);

    // 加载所有待处理的记录文件
    let mut files = load_all_record_files(&config.records_folder).await?;
    if files.is_empty() {
        warn!("⚠️ 没有找到待处理的TOML文件，程序结束");
        return Ok(());
    }

    let record_count: usize = files.iter().map(|f| f.records.len()).sum();
    logging::log_records_loaded(files.len(), record_count);

    // 构建引擎与进度回调
    let engine = LabelEngine::from_config(&config);
    let progress: ProgressCallback = Arc::new(|current, total, message| {
        info!("[{}/{}] {}", current, total, message);
    });

    // 逐文件生成标签并写回
    let mut overall = RunReport::default();
    for file in &mut files {
        let report = engine
            .generate_labels(&mut file.records, Arc::clone(&progress), None)
            .await;

        // 补全自动标签词（已有标签词的记录保持不动）
        for record in &mut file.records {
            if record.tags.is_empty() {
                record.tags = generate_tags_auto(&record.text);
            }
        }

        save_record_file(file).await?;
        overall.merge(report);
    }

    // 输出最终统计并落日志文件
    logging::print_final_stats(&overall, &config.output_log_file);
    logging::write_run_log(&config.output_log_file, &overall)?;

    Ok(())
}
