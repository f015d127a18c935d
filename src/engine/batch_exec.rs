//! 批量任务执行器
//!
//! ## 状态机
//!
//! | 状态 | 动作 | 转移 |
//! |---|---|---|
//! | 准备 | 为每条记录构造带关联 ID 的请求，暂存请求产物 | → 提交 |
//! | 提交 | 一次批量创建调用，记下任务 ID 与提交时间 | → 轮询 |
//! | 轮询 | 固定间隔休眠后查询状态，上报尽力而为的进度 | 处理中自环；终止状态退出；超时兜底 |
//! | 完成 | 取回全部结果，按关联 ID 分发回各记录 | 终止 |
//! | 取消/过期/超时 | 整批失败，一条汇总错误 | 终止 |
//!
//! 本地没有任何并发，一个任务阻塞式走完轮询循环；真正的并行在
//! 服务端发生，对这里不可见。运行开始后无法中途取消。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::time::{sleep, Instant};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::batch::{BatchApi, BatchOutcome, BatchRequestItem, BatchStatus};
use crate::engine::report::RunReport;
use crate::engine::ProgressCallback;
use crate::error::JobError;
use crate::models::PromptRecord;
use crate::utils::text::{sanitize_label, truncate_text};

/// 一次远程批量任务的句柄
///
/// 提交时创建，结果取回或失败后即丢弃。
#[derive(Clone, Debug)]
pub struct BatchJobHandle {
    pub job_id: String,
    pub submitted_at: DateTime<Local>,
    pub status: BatchStatus,
}

impl BatchJobHandle {
    /// 状态单调推进：进入终止状态后不再改变
    fn advance(&mut self, next: BatchStatus) {
        if !self.status.is_terminal() {
            self.status = next;
        }
    }
}

/// 暂存的请求产物
///
/// 提交前把整批请求落一份 JSONL 到临时目录，便于排查。Drop 负责
/// 清理，所以无论执行器从哪条路径退出文件都不会残留。
struct StagedRequests {
    path: PathBuf,
}

impl StagedRequests {
    fn write(requests: &[BatchRequestItem]) -> Option<Self> {
        let path = std::env::temp_dir().join(format!(
            "auto-labeler-batch-{}.jsonl",
            Uuid::new_v4()
        ));

        let mut lines = String::new();
        for request in requests {
            match serde_json::to_string(request) {
                Ok(line) => {
                    lines.push_str(&line);
                    lines.push('\n');
                }
                Err(e) => {
                    warn!("暂存批量请求序列化失败: {}", e);
                    return None;
                }
            }
        }

        match std::fs::write(&path, lines) {
            Ok(()) => Some(Self { path }),
            Err(e) => {
                // 暂存失败不阻塞提交，只是少了排查材料
                warn!("暂存批量请求失败: {}", e);
                None
            }
        }
    }
}

impl Drop for StagedRequests {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("清理暂存文件失败 {}: {}", self.path.display(), e);
        }
    }
}

/// 批量任务执行器
pub struct BatchJobExecutor {
    api: Arc<dyn BatchApi>,
    poll_interval: Duration,
    max_wait: Duration,
}

impl BatchJobExecutor {
    pub fn new(api: Arc<dyn BatchApi>, poll_interval: Duration, max_wait: Duration) -> Self {
        Self {
            api,
            poll_interval,
            max_wait,
        }
    }

    /// 提交整批记录并等待结果
    ///
    /// 非正常终止（取消/过期/超时）没有部分结果可以抢救，整批记
    /// 为失败；正常完成后恢复单条粒度，缺失或失败的关联 ID 各计
    /// 一条失败。
    pub async fn run(
        &self,
        records: &mut [PromptRecord],
        targets: &[usize],
        progress: &ProgressCallback,
    ) -> RunReport {
        let total = targets.len();
        let mut report = RunReport::default();
        if total == 0 {
            return report;
        }

        // --- 准备：构造带关联 ID 的请求 ---
        let mut requests = Vec::with_capacity(total);
        let mut correlation: HashMap<String, usize> = HashMap::with_capacity(total);
        for &idx in targets {
            let custom_id = format!("rec-{}-{}", idx, Uuid::new_v4());
            correlation.insert(custom_id.clone(), idx);
            requests.push(BatchRequestItem {
                custom_id,
                text: records[idx].text.clone(),
            });
        }

        // Drop 保证任何退出路径上都清理
        let _staged = StagedRequests::write(&requests);

        // --- 提交 ---
        let job_id = match self.api.submit(&requests).await {
            Ok(id) => id,
            Err(e) => {
                report.record_job_failure(
                    total,
                    JobError::SubmitFailed {
                        detail: e.to_string(),
                    }
                    .to_string(),
                );
                return report;
            }
        };

        let mut handle = BatchJobHandle {
            job_id,
            submitted_at: Local::now(),
            status: BatchStatus::Submitted,
        };
        info!(
            "📦 批量任务已提交: {} ({} 条记录, {})",
            handle.job_id,
            total,
            handle.submitted_at.format("%Y-%m-%d %H:%M:%S")
        );

        // --- 轮询 ---
        let deadline = Instant::now() + self.max_wait;
        loop {
            sleep(self.poll_interval).await;

            if Instant::now() >= deadline {
                handle.advance(BatchStatus::TimedOut);
                report.record_job_failure(
                    total,
                    JobError::Timeout {
                        waited_secs: self.max_wait.as_secs(),
                        outstanding: total,
                    }
                    .to_string(),
                );
                return report;
            }

            let status_report = match self.api.poll_status(&handle.job_id).await {
                Ok(r) => r,
                Err(e) => {
                    // 单次轮询失败视作瞬时故障，下一轮重试，超时兜底
                    warn!("轮询批量任务状态失败: {}", e);
                    continue;
                }
            };

            handle.advance(status_report.status);

            let succeeded = status_report.succeeded.unwrap_or(0);
            let errored = status_report.errored.unwrap_or(0);
            progress(
                (succeeded + errored).min(total),
                total,
                &format!(
                    "批量任务{}: 成功 {} / 失败 {} / 处理中 {}",
                    handle.status,
                    succeeded,
                    errored,
                    status_report.processing.unwrap_or(0)
                ),
            );

            match handle.status {
                BatchStatus::Submitted | BatchStatus::Processing => continue,
                BatchStatus::Ended => break,
                BatchStatus::Canceled | BatchStatus::Expired | BatchStatus::TimedOut => {
                    report.record_job_failure(
                        total,
                        JobError::Terminal {
                            job_id: handle.job_id.clone(),
                            status: handle.status,
                            outstanding: total,
                        }
                        .to_string(),
                    );
                    return report;
                }
            }
        }

        // --- 结果取回与分发 ---
        let results = match self.api.fetch_results(&handle.job_id).await {
            Ok(r) => r,
            Err(e) => {
                report.record_job_failure(
                    total,
                    JobError::ResultsFetchFailed {
                        job_id: handle.job_id.clone(),
                        detail: e.to_string(),
                    }
                    .to_string(),
                );
                return report;
            }
        };

        for item in results {
            match correlation.remove(&item.custom_id) {
                Some(idx) => {
                    let preview = truncate_text(&records[idx].text, 30);
                    match item.outcome {
                        BatchOutcome::Succeeded(raw_label) => {
                            let label = sanitize_label(&raw_label);
                            if label.is_empty() {
                                report.record_failure(format!(
                                    "标签生成失败（返回为空）: {}",
                                    preview
                                ));
                            } else {
                                records[idx].apply_label(label);
                                report.record_success();
                            }
                        }
                        BatchOutcome::Errored(detail) => {
                            report.record_failure(format!(
                                "标签生成失败: {} - {}",
                                preview, detail
                            ));
                        }
                    }
                }
                None => {
                    // 未知或重复的关联 ID：防御性忽略，不中断整个分发
                    warn!("批量结果包含未知或重复的关联 ID: {}", item.custom_id);
                }
            }
        }

        // 结果流里缺失的关联 ID 逐条计为失败
        for (_custom_id, idx) in correlation {
            report.record_failure(format!(
                "批量结果缺失该记录: {}",
                truncate_text(&records[idx].text, 30)
            ));
        }

        debug_assert_eq!(report.total(), total);
        report
    }
}
