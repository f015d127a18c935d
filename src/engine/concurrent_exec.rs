//! 并发执行器
//!
//! ## 并发模型
//!
//! - 每条目标记录一个 `tokio::spawn` 任务
//! - `Semaphore` 限制在途的供应商调用数量，permit 绑定在任务局部
//!   变量上，任何退出路径都会释放
//! - 所有结果经单一 mpsc 汇聚通道回到调用方任务，记录修改和计数
//!   都发生在调用方这一侧，天然无竞争
//! - 通道耗尽后 join 全部任务句柄才返回，不存在部分提前返回
//!
//! 完成顺序不保证，错误信息的顺序也随之不确定；计数与顺序无关。

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, Semaphore};
use tracing::error;

use crate::engine::fallback::{FallbackChain, LabeledOutcome};
use crate::engine::report::RunReport;
use crate::engine::ProgressCallback;
use crate::error::LabelError;
use crate::models::PromptRecord;
use crate::utils::text::truncate_text;

/// 并发处理所有目标记录
pub async fn run(
    chain: Arc<FallbackChain>,
    records: &mut [PromptRecord],
    targets: &[usize],
    max_concurrency: usize,
    progress: ProgressCallback,
) -> RunReport {
    let total = targets.len();
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let (tx, mut rx) =
        mpsc::channel::<(usize, Result<LabeledOutcome, LabelError>, String)>(total.max(1));

    let mut handles = Vec::with_capacity(total);
    for &idx in targets {
        let chain = Arc::clone(&chain);
        let semaphore = Arc::clone(&semaphore);
        let tx = tx.clone();
        let text = records[idx].text.clone();

        let handle = tokio::spawn(async move {
            // acquire 只会在 Semaphore 被关闭时出错，这里不会发生
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let preview = truncate_text(&text, 30);
            let outcome = chain.label_one(&text).await;

            // 接收端先退出时发送失败，任务直接结束即可
            let _ = tx.send((idx, outcome, preview)).await;
        });
        handles.push((idx, handle));
    }
    drop(tx);

    // 汇聚阶段：修改记录、更新计数、触发进度，全部在当前任务上串行
    let mut report = RunReport::default();
    let mut done = 0usize;
    while let Some((idx, outcome, preview)) = rx.recv().await {
        done += 1;
        progress(done, total, &format!("已完成 {}/{}", done, total));

        match outcome {
            Ok(labeled) => {
                records[idx].apply_label(labeled.label);
                report.record_success();
            }
            Err(e) => {
                report.record_failure(format!("标签生成失败: {} - {}", preview, e));
            }
        }
    }

    // 通道耗尽意味着所有发送端都已释放；join 回收异常退出的任务，
    // 没能发出结果的记录逐条计为失败
    let joined = join_all(
        handles
            .into_iter()
            .map(|(idx, handle)| async move { (idx, handle.await) }),
    )
    .await;
    for (idx, joined_result) in joined {
        if let Err(e) = joined_result {
            error!("标注任务异常退出: {}", e);
            done += 1;
            progress(done, total, &format!("已完成 {}/{}", done, total));
            report.record_failure(format!(
                "标签生成失败: {} - {}",
                truncate_text(&records[idx].text, 30),
                LabelError::Unexpected(e.to_string())
            ));
        }
    }

    // 极端情况兜底：任务既没发结果也没有 JoinError（理论上不会发生）
    while report.total() < total {
        done += 1;
        progress(done, total, &format!("已完成 {}/{}", done, total));
        report.record_failure(format!(
            "{}",
            LabelError::Unexpected("任务未返回结果".to_string())
        ));
    }

    report
}
