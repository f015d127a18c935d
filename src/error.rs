use std::fmt;

use crate::api::batch::BatchStatus;

/// 标签生成错误类型
///
/// 四类错误的恢复边界各不相同：
/// - `Provider`：单个供应商调用失败，在回退链内部被吞掉，换下一级
/// - `Item`：单条记录无法生成标签，只影响这一条
/// - `Job`：远程批量任务整体失败，覆盖整批未完成的记录
/// - `Unexpected`：兜底分类，保证一条坏记录不会中断整次运行
#[derive(Debug)]
pub enum LabelError {
    /// 供应商调用错误
    Provider(ProviderError),
    /// 单条记录错误
    Item(ItemError),
    /// 批量任务错误
    Job(JobError),
    /// 其他未预期的错误
    Unexpected(String),
}

impl fmt::Display for LabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelError::Provider(e) => write!(f, "供应商错误: {}", e),
            LabelError::Item(e) => write!(f, "{}", e),
            LabelError::Job(e) => write!(f, "{}", e),
            LabelError::Unexpected(msg) => write!(f, "未预期的错误: {}", msg),
        }
    }
}

impl std::error::Error for LabelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LabelError::Provider(e) => Some(e),
            LabelError::Item(e) => Some(e),
            LabelError::Job(e) => Some(e),
            LabelError::Unexpected(_) => None,
        }
    }
}

/// 供应商调用错误
///
/// 只在回退链内部流转，不会越过 `run()` 边界向调用方抛出。
#[derive(Debug)]
pub enum ProviderError {
    /// 供应商当前不可用（未配置 API Key 等）
    Unavailable { provider: String },
    /// API 调用失败
    CallFailed { provider: String, detail: String },
    /// 返回了空白标签
    EmptyLabel { provider: String },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Unavailable { provider } => {
                write!(f, "供应商 {} 当前不可用", provider)
            }
            ProviderError::CallFailed { provider, detail } => {
                write!(f, "供应商 {} 调用失败: {}", provider, detail)
            }
            ProviderError::EmptyLabel { provider } => {
                write!(f, "供应商 {} 返回空白标签", provider)
            }
        }
    }
}

impl std::error::Error for ProviderError {}

/// 单条记录错误
#[derive(Debug)]
pub enum ItemError {
    /// 记录文本为空
    EmptyText,
    /// 回退链所有层级均未能产出标签
    AllTiersFailed { preview: String },
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemError::EmptyText => write!(f, "记录文本为空，无法生成标签"),
            ItemError::AllTiersFailed { preview } => {
                write!(f, "所有层级均未能生成标签: {}", preview)
            }
        }
    }
}

impl std::error::Error for ItemError {}

/// 批量任务错误
///
/// 批量任务一旦进入非正常终止状态，就没有任何部分结果可以抢救，
/// 所以错误范围是整批未完成的记录而不是单条。
#[derive(Debug)]
pub enum JobError {
    /// 提交批量任务失败
    SubmitFailed { detail: String },
    /// 任务进入非正常终止状态（取消/过期）
    Terminal {
        job_id: String,
        status: BatchStatus,
        outstanding: usize,
    },
    /// 本地等待超时
    Timeout {
        waited_secs: u64,
        outstanding: usize,
    },
    /// 结果取回失败
    ResultsFetchFailed { job_id: String, detail: String },
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::SubmitFailed { detail } => {
                write!(f, "批量任务提交失败: {}", detail)
            }
            JobError::Terminal {
                job_id,
                status,
                outstanding,
            } => {
                write!(
                    f,
                    "批量任务进入终止状态「{}」(任务: {})，整批 {} 条记录失败",
                    status, job_id, outstanding
                )
            }
            JobError::Timeout {
                waited_secs,
                outstanding,
            } => {
                write!(
                    f,
                    "批量任务等待超时（已等待 {} 秒），整批 {} 条记录失败",
                    waited_secs, outstanding
                )
            }
            JobError::ResultsFetchFailed { job_id, detail } => {
                write!(f, "批量任务结果获取失败 (任务: {}): {}", job_id, detail)
            }
        }
    }
}

impl std::error::Error for JobError {}

// ========== 从子错误类型转换 ==========

impl From<ProviderError> for LabelError {
    fn from(err: ProviderError) -> Self {
        LabelError::Provider(err)
    }
}

impl From<ItemError> for LabelError {
    fn from(err: ItemError) -> Self {
        LabelError::Item(err)
    }
}

impl From<JobError> for LabelError {
    fn from(err: JobError) -> Self {
        LabelError::Job(err)
    }
}

/// 引擎内部结果类型别名
pub type AppResult<T> = Result<T, LabelError>;
