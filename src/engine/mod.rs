//! 标签生成引擎 - 编排层
//!
//! ## 职责
//!
//! 本层是整个标注流程的"指挥中心"：筛选缺少标签的记录、按批量
//! 大小选择执行模式、调度对应的执行器，最后把统一形状的运行报告
//! 返回给调用方。标签直接写回传入的记录，持久化由调用方负责。
//!
//! ## 模块划分
//!
//! - `selector` - 记录筛选与执行模式选择
//! - `fallback` - 多级回退链（逐条标注的核心）
//! - `sync_exec` - 顺序执行器（小批量）
//! - `concurrent_exec` - 有界并发执行器（中批量）
//! - `batch_exec` - 远程批量任务执行器（大批量）
//! - `report` - 三种模式共用的运行报告
//!
//! ## 层次关系
//!
//! ```text
//! LabelEngine (选目标、选模式)
//!     ↓
//! sync_exec / concurrent_exec / batch_exec
//!     ↓
//! FallbackChain（前两者） / BatchApi（批量模式）
//!     ↓
//! providers (能力层：云端 / 本地 / 启发式)
//! ```
//!
//! ## 限制
//!
//! 运行一旦开始就会进行到底（批量模式有自己的内部超时），不支持
//! 中途取消。

pub mod batch_exec;
pub mod concurrent_exec;
pub mod fallback;
pub mod report;
pub mod selector;
pub mod sync_exec;

pub use batch_exec::{BatchJobExecutor, BatchJobHandle};
pub use fallback::{FallbackChain, LabeledOutcome};
pub use report::RunReport;
pub use selector::{unlabeled_indices, ExecutionMode};

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::api::batch::{BatchApi, HttpBatchClient};
use crate::config::Config;
use crate::models::PromptRecord;

/// 进度回调：（当前进度、总数、消息）
///
/// 顺序/并发模式下每条记录至少触发一次，批量模式下每次轮询触发
/// 一次；并发模式下可能从非调用方线程触发。
pub type ProgressCallback = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

/// 不需要进度时的空回调
pub fn noop_progress() -> ProgressCallback {
    Arc::new(|_, _, _| {})
}

/// 标签生成引擎
pub struct LabelEngine {
    chain: Arc<FallbackChain>,
    batch_api: Arc<dyn BatchApi>,
    config: Config,
}

impl LabelEngine {
    /// 创建引擎，回退链与批量 API 由调用方注入（测试注入替身）
    pub fn new(chain: FallbackChain, batch_api: Arc<dyn BatchApi>, config: Config) -> Self {
        Self {
            chain: Arc::new(chain),
            batch_api,
            config,
        }
    }

    /// 按配置构造：真实供应商回退链 + HTTP 批量客户端
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            FallbackChain::from_config(config),
            Arc::new(HttpBatchClient::new(config)),
            config.clone(),
        )
    }

    /// 为所有缺少标签的记录生成标签
    ///
    /// 标签直接写回 `records`；`mode_override` 为 None 时按批量大小
    /// 自动选择执行模式。本方法从不向外抛错，所有失败都收敛进返回
    /// 的 [`RunReport`]。
    pub async fn generate_labels(
        &self,
        records: &mut [PromptRecord],
        progress: ProgressCallback,
        mode_override: Option<ExecutionMode>,
    ) -> RunReport {
        let targets = unlabeled_indices(records);

        let auto_mode = ExecutionMode::for_batch_size(
            targets.len(),
            self.config.sync_threshold,
            self.config.concurrent_threshold,
        );
        let Some(mode) = mode_override.or(auto_mode) else {
            info!("没有需要生成标签的记录");
            return RunReport::default();
        };

        info!("🏷️ 待标注记录: {} 条，执行模式: {:?}", targets.len(), mode);

        let report = match mode {
            ExecutionMode::Sync => {
                sync_exec::run(&self.chain, records, &targets, &progress).await
            }
            ExecutionMode::Concurrent => {
                concurrent_exec::run(
                    Arc::clone(&self.chain),
                    records,
                    &targets,
                    self.config.max_concurrency,
                    Arc::clone(&progress),
                )
                .await
            }
            ExecutionMode::BatchJob => {
                let executor = BatchJobExecutor::new(
                    Arc::clone(&self.batch_api),
                    Duration::from_secs(self.config.poll_interval_secs),
                    Duration::from_secs(self.config.batch_max_wait_secs),
                );
                executor.run(records, &targets, &progress).await
            }
        };

        debug_assert_eq!(report.total(), targets.len());
        report
    }
}
