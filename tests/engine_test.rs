//! 引擎端到端测试
//!
//! 使用脚本化的供应商与批量 API 替身，不访问网络。覆盖三种执行
//! 模式的选择、计数不变式、并发上限、批量任务的各种终止路径。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use auto_labeler::api::batch::{
    BatchApi, BatchApiError, BatchOutcome, BatchRequestItem, BatchResultItem, BatchStatus,
    BatchStatusReport,
};
use auto_labeler::engine::batch_exec::BatchJobExecutor;
use auto_labeler::engine::{noop_progress, unlabeled_indices, ExecutionMode, FallbackChain, LabelEngine};
use auto_labeler::error::ProviderError;
use auto_labeler::models::{LabelSource, PromptRecord};
use auto_labeler::providers::{HeuristicProvider, LabelProvider};
use auto_labeler::Config;

// ========== 测试替身 ==========

/// 脚本化供应商：可配置成败，并用计数器观测在途调用数
struct ScriptedProvider {
    name: &'static str,
    priority: u8,
    available: bool,
    fail: bool,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    max_observed: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    fn succeeding(name: &'static str, priority: u8) -> Self {
        Self {
            name,
            priority,
            available: true,
            fail: false,
            delay: Duration::from_millis(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_observed: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing(name: &'static str, priority: u8) -> Self {
        Self {
            fail: true,
            ..Self::succeeding(name, priority)
        }
    }
}

#[async_trait]
impl LabelProvider for ScriptedProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn try_label(&self, text: &str) -> Result<String, ProviderError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_observed.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            Err(ProviderError::CallFailed {
                provider: self.name.to_string(),
                detail: "模拟故障".to_string(),
            })
        } else {
            Ok(format!("标签:{}", text))
        }
    }
}

/// 脚本化批量 API：按脚本逐次返回状态，记录提交的请求
struct ScriptedBatchApi {
    statuses: Mutex<Vec<BatchStatus>>,
    submitted: Mutex<Vec<BatchRequestItem>>,
    poll_count: AtomicUsize,
    /// 取结果时丢弃前多少条（模拟结果流缺失）
    drop_first: usize,
}

impl ScriptedBatchApi {
    fn new(statuses: Vec<BatchStatus>) -> Self {
        Self {
            statuses: Mutex::new(statuses),
            submitted: Mutex::new(Vec::new()),
            poll_count: AtomicUsize::new(0),
            drop_first: 0,
        }
    }

    fn dropping_first(statuses: Vec<BatchStatus>, drop_first: usize) -> Self {
        Self {
            drop_first,
            ..Self::new(statuses)
        }
    }
}

#[async_trait]
impl BatchApi for ScriptedBatchApi {
    async fn submit(&self, requests: &[BatchRequestItem]) -> Result<String, BatchApiError> {
        self.submitted.lock().unwrap().extend_from_slice(requests);
        Ok("job-test-001".to_string())
    }

    async fn poll_status(&self, _job_id: &str) -> Result<BatchStatusReport, BatchApiError> {
        self.poll_count.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.statuses.lock().unwrap();
        // 脚本耗尽后一直报处理中
        let status = if statuses.is_empty() {
            BatchStatus::Processing
        } else {
            statuses.remove(0)
        };
        Ok(BatchStatusReport {
            status,
            succeeded: None,
            errored: None,
            processing: None,
        })
    }

    async fn fetch_results(&self, _job_id: &str) -> Result<Vec<BatchResultItem>, BatchApiError> {
        let submitted = self.submitted.lock().unwrap();
        Ok(submitted
            .iter()
            .skip(self.drop_first)
            .map(|req| BatchResultItem {
                custom_id: req.custom_id.clone(),
                outcome: BatchOutcome::Succeeded(format!("批签:{}", req.text)),
            })
            .collect())
    }
}

// ========== 辅助函数 ==========

fn make_records(n: usize) -> Vec<PromptRecord> {
    (0..n)
        .map(|i| {
            PromptRecord::new(
                format!("r{}", i),
                format!("spacious classroom interior with rows of desks, scene {}", i),
            )
        })
        .collect()
}

fn fast_batch_config() -> Config {
    Config {
        poll_interval_secs: 0,
        ..Config::default()
    }
}

fn engine_with(
    providers: Vec<Box<dyn LabelProvider>>,
    api: Arc<ScriptedBatchApi>,
    config: Config,
) -> LabelEngine {
    LabelEngine::new(FallbackChain::new(providers), api, config)
}

// ========== 场景测试 ==========

/// 场景 A：10 条记录，主力供应商全部成功 → 顺序模式，全部 AI 生成
#[tokio::test]
async fn scenario_primary_provider_succeeds_in_sync_mode() {
    let primary = ScriptedProvider::succeeding("主力", 0);
    let api = Arc::new(ScriptedBatchApi::new(vec![]));
    let engine = engine_with(
        vec![Box::new(primary), Box::new(HeuristicProvider::new(3, 30))],
        Arc::clone(&api),
        Config::default(),
    );

    let mut records = make_records(10);
    let report = engine
        .generate_labels(&mut records, noop_progress(), None)
        .await;

    assert_eq!(report.success_count, 10);
    assert_eq!(report.failure_count, 0);
    assert!(report.errors.is_empty());
    for record in &records {
        assert!(record.label.as_deref().unwrap_or("").starts_with("标签:"));
        assert_eq!(record.label_source, Some(LabelSource::AiGenerated));
    }
    // 小批量不应动批量 API
    assert!(api.submitted.lock().unwrap().is_empty());
}

/// 场景 B：所有配置的供应商都失败 → 启发式兜底，标签为截断文本
#[tokio::test]
async fn scenario_all_providers_fail_heuristic_saves_the_day() {
    let api = Arc::new(ScriptedBatchApi::new(vec![]));
    let engine = engine_with(
        vec![
            Box::new(ScriptedProvider::failing("主力", 0)),
            Box::new(ScriptedProvider::failing("备用", 1)),
            Box::new(HeuristicProvider::new(3, 30)),
        ],
        api,
        Config::default(),
    );

    let mut records = make_records(10);
    let report = engine
        .generate_labels(&mut records, noop_progress(), None)
        .await;

    assert_eq!(report.success_count, 10);
    assert_eq!(report.failure_count, 0);
    for record in &records {
        let expected = if record.text.chars().count() > 30 {
            record.text.chars().take(30).collect::<String>() + "..."
        } else {
            record.text.clone()
        };
        assert_eq!(record.label.as_deref(), Some(expected.as_str()));
        // 兜底产出的标签来源同样记为 AI 生成
        assert_eq!(record.label_source, Some(LabelSource::AiGenerated));
    }
}

/// 场景 C：1500 条记录，批量任务两次轮询后过期 → 整批失败一条错误
#[tokio::test]
async fn scenario_batch_job_expired_fails_whole_batch() {
    let api = Arc::new(ScriptedBatchApi::new(vec![
        BatchStatus::Processing,
        BatchStatus::Expired,
    ]));
    let engine = engine_with(
        vec![Box::new(HeuristicProvider::new(3, 30))],
        Arc::clone(&api),
        fast_batch_config(),
    );

    let mut records = make_records(1500);
    let report = engine
        .generate_labels(&mut records, noop_progress(), None)
        .await;

    assert_eq!(report.success_count, 0);
    assert_eq!(report.failure_count, 1500);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("过期"), "错误信息: {}", report.errors[0]);
    assert_eq!(api.poll_count.load(Ordering::SeqCst), 2);
    // 没有任何记录被打上标签
    assert!(records.iter().all(|r| r.needs_label()));
}

// ========== 模式选择 ==========

#[tokio::test]
async fn empty_selection_returns_empty_report_without_executing() {
    let api = Arc::new(ScriptedBatchApi::new(vec![]));
    let engine = engine_with(
        vec![Box::new(HeuristicProvider::new(3, 30))],
        Arc::clone(&api),
        Config::default(),
    );

    let mut records = make_records(5);
    for record in &mut records {
        record.apply_label("已有标签".to_string());
    }

    let report = engine
        .generate_labels(&mut records, noop_progress(), None)
        .await;

    assert_eq!(report.total(), 0);
    assert!(report.errors.is_empty());
    assert!(api.submitted.lock().unwrap().is_empty());
    assert_eq!(api.poll_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn selection_is_idempotent_after_successful_run() {
    let api = Arc::new(ScriptedBatchApi::new(vec![]));
    let engine = engine_with(
        vec![Box::new(HeuristicProvider::new(3, 30))],
        api,
        Config::default(),
    );

    let mut records = make_records(8);
    engine
        .generate_labels(&mut records, noop_progress(), None)
        .await;

    assert!(unlabeled_indices(&records).is_empty());

    // 第二次运行：没有目标，立即返回空报告
    let second = engine
        .generate_labels(&mut records, noop_progress(), None)
        .await;
    assert_eq!(second.total(), 0);
}

#[tokio::test]
async fn large_batch_auto_selects_batch_job_mode() {
    let api = Arc::new(ScriptedBatchApi::new(vec![BatchStatus::Ended]));
    let engine = engine_with(
        vec![Box::new(HeuristicProvider::new(3, 30))],
        Arc::clone(&api),
        fast_batch_config(),
    );

    let mut records = make_records(1001);
    let report = engine
        .generate_labels(&mut records, noop_progress(), None)
        .await;

    assert_eq!(api.submitted.lock().unwrap().len(), 1001);
    assert_eq!(report.success_count, 1001);
    assert_eq!(report.failure_count, 0);
}

// ========== 并发执行器 ==========

/// 有界并发：插桩供应商观测到的在途调用数不得超过并发上限
#[tokio::test]
async fn concurrent_mode_never_exceeds_gate() {
    let provider = ScriptedProvider {
        delay: Duration::from_millis(5),
        ..ScriptedProvider::succeeding("主力", 0)
    };
    let max_observed = Arc::clone(&provider.max_observed);

    let api = Arc::new(ScriptedBatchApi::new(vec![]));
    let config = Config {
        max_concurrency: 4,
        ..Config::default()
    };
    let engine = engine_with(
        vec![Box::new(provider), Box::new(HeuristicProvider::new(3, 30))],
        api,
        config,
    );

    let mut records = make_records(80);
    let report = engine
        .generate_labels(&mut records, noop_progress(), None)
        .await;

    assert_eq!(report.success_count, 80);
    assert_eq!(report.failure_count, 0);
    let peak = max_observed.load(Ordering::SeqCst);
    assert!(peak <= 4, "观测到 {} 个并发调用，超过上限 4", peak);
    assert!(peak >= 1);
}

#[tokio::test]
async fn concurrent_mode_progress_fires_once_per_record() {
    let api = Arc::new(ScriptedBatchApi::new(vec![]));
    let engine = engine_with(
        vec![Box::new(HeuristicProvider::new(3, 30))],
        api,
        Config::default(),
    );

    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = Arc::clone(&calls);
    let progress: auto_labeler::ProgressCallback = Arc::new(move |_current, total, _message| {
        assert_eq!(total, 60);
        calls_clone.fetch_add(1, Ordering::SeqCst);
    });

    let mut records = make_records(60);
    let report = engine
        .generate_labels(&mut records, progress, Some(ExecutionMode::Concurrent))
        .await;

    assert_eq!(report.success_count, 60);
    assert_eq!(calls.load(Ordering::SeqCst), 60);
}

// ========== 批量执行器 ==========

/// 服务端永远报处理中 → 本地超时兜底，整批失败而不是挂死
#[tokio::test]
async fn batch_poll_forever_times_out() {
    let api = Arc::new(ScriptedBatchApi::new(vec![]));
    let executor = BatchJobExecutor::new(
        Arc::clone(&api) as Arc<dyn BatchApi>,
        Duration::from_millis(1),
        Duration::from_millis(30),
    );

    let mut records = make_records(5);
    let targets = unlabeled_indices(&records);
    let report = executor.run(&mut records, &targets, &noop_progress()).await;

    assert_eq!(report.success_count, 0);
    assert_eq!(report.failure_count, 5);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("超时"), "错误信息: {}", report.errors[0]);
}

/// 结果流缺失部分关联 ID → 缺失的逐条计为失败，不是整批失败
#[tokio::test]
async fn batch_missing_results_are_item_failures() {
    let api = Arc::new(ScriptedBatchApi::dropping_first(
        vec![BatchStatus::Ended],
        2,
    ));
    let executor = BatchJobExecutor::new(
        Arc::clone(&api) as Arc<dyn BatchApi>,
        Duration::from_millis(0),
        Duration::from_secs(60),
    );

    let mut records = make_records(6);
    let targets = unlabeled_indices(&records);
    let report = executor.run(&mut records, &targets, &noop_progress()).await;

    assert_eq!(report.success_count, 4);
    assert_eq!(report.failure_count, 2);
    assert_eq!(report.errors.len(), 2);
    assert_eq!(report.total(), 6);
    for err in &report.errors {
        assert!(err.contains("缺失"), "错误信息: {}", err);
    }
}

/// 任务被取消 → 整批失败一条错误
#[tokio::test]
async fn batch_canceled_is_a_job_failure() {
    let api = Arc::new(ScriptedBatchApi::new(vec![BatchStatus::Canceled]));
    let executor = BatchJobExecutor::new(
        Arc::clone(&api) as Arc<dyn BatchApi>,
        Duration::from_millis(0),
        Duration::from_secs(60),
    );

    let mut records = make_records(12);
    let targets = unlabeled_indices(&records);
    let report = executor.run(&mut records, &targets, &noop_progress()).await;

    assert_eq!(report.failure_count, 12);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("取消"));
}

/// 正常完成：标签写回记录，关联 ID 对号入座
#[tokio::test]
async fn batch_ended_applies_labels_by_correlation_id() {
    let api = Arc::new(ScriptedBatchApi::new(vec![
        BatchStatus::Processing,
        BatchStatus::Ended,
    ]));
    let executor = BatchJobExecutor::new(
        Arc::clone(&api) as Arc<dyn BatchApi>,
        Duration::from_millis(0),
        Duration::from_secs(60),
    );

    let mut records = make_records(4);
    let targets = unlabeled_indices(&records);
    let report = executor.run(&mut records, &targets, &noop_progress()).await;

    assert_eq!(report.success_count, 4);
    for record in &records {
        assert_eq!(
            record.label.as_deref(),
            Some(format!("批签:{}", record.text).as_str())
        );
        assert_eq!(record.label_source, Some(LabelSource::AiGenerated));
    }
}
