//! 顺序执行器
//!
//! 严格按输入顺序逐条处理，调用方任务上顺序 await，没有任何并发。
//! 小批量时省去了任务调度的开销，进度回调也保证按输入顺序触发。

use tracing::debug;

use crate::engine::fallback::FallbackChain;
use crate::engine::report::RunReport;
use crate::engine::ProgressCallback;
use crate::models::PromptRecord;
use crate::utils::text::truncate_text;

/// 顺序处理所有目标记录
///
/// 每条记录恰好触发一次进度回调，无论成败；任何失败只影响当前
/// 这一条，循环继续。
pub async fn run(
    chain: &FallbackChain,
    records: &mut [PromptRecord],
    targets: &[usize],
    progress: &ProgressCallback,
) -> RunReport {
    let total = targets.len();
    let mut report = RunReport::default();

    for (i, &idx) in targets.iter().enumerate() {
        let preview = truncate_text(&records[idx].text, 30);
        progress(i + 1, total, &format!("正在生成标签: {}", preview));

        match chain.label_one(&records[idx].text).await {
            Ok(outcome) => {
                debug!(
                    "记录 {} 由 {} 生成标签: {}",
                    records[idx].id, outcome.provider, outcome.label
                );
                records[idx].apply_label(outcome.label);
                report.record_success();
            }
            Err(e) => {
                report.record_failure(format!("标签生成失败: {} - {}", preview, e));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::noop_progress;
    use crate::engine::selector::unlabeled_indices;
    use crate::models::LabelSource;
    use crate::providers::HeuristicProvider;
    use std::sync::{Arc, Mutex};

    fn heuristic_chain() -> FallbackChain {
        FallbackChain::new(vec![Box::new(HeuristicProvider::new(0, 30))])
    }

    #[tokio::test]
    async fn test_processes_in_input_order_with_progress() {
        let mut records = vec![
            PromptRecord::new("r1", "classroom interior"),
            PromptRecord::new("r2", "school rooftop"),
            PromptRecord::new("r3", "library shelves"),
        ];
        let targets = unlabeled_indices(&records);

        let seen: Arc<Mutex<Vec<(usize, usize)>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let progress: ProgressCallback = Arc::new(move |current, total, _message| {
            seen_clone.lock().unwrap().push((current, total));
        });

        let chain = heuristic_chain();
        let report = run(&chain, &mut records, &targets, &progress).await;

        assert_eq!(report.success_count, 3);
        assert_eq!(report.failure_count, 0);
        assert_eq!(*seen.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
        for record in &records {
            assert_eq!(record.label_source, Some(LabelSource::AiGenerated));
        }
    }

    #[tokio::test]
    async fn test_blank_record_counts_one_failure() {
        let mut records = vec![
            PromptRecord::new("r1", "   "),
            PromptRecord::new("r2", "school rooftop"),
        ];
        let targets = unlabeled_indices(&records);

        let chain = heuristic_chain();
        let report = run(&chain, &mut records, &targets, &noop_progress()).await;

        assert_eq!(report.success_count, 1);
        assert_eq!(report.failure_count, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.total(), targets.len());
    }
}
