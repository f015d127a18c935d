//! 记录筛选与执行模式选择

use crate::models::PromptRecord;

/// 执行模式，一次运行开始时确定，运行期间不变
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    /// 顺序逐条处理
    Sync,
    /// 有界并发处理
    Concurrent,
    /// 提交远程批量任务
    BatchJob,
}

impl ExecutionMode {
    /// 按批量大小选择执行模式
    ///
    /// 远程批量任务的往返开销只在大批量时划算；中间档用有界并发
    /// 换吞吐。`n == 0` 时返回 None，调用方直接返回空报告。
    pub fn for_batch_size(n: usize, sync_max: usize, concurrent_max: usize) -> Option<Self> {
        if n == 0 {
            None
        } else if n <= sync_max {
            Some(ExecutionMode::Sync)
        } else if n <= concurrent_max {
            Some(ExecutionMode::Concurrent)
        } else {
            Some(ExecutionMode::BatchJob)
        }
    }
}

/// 选出所有缺少有效标签的记录下标
///
/// 纯过滤，不修改记录；对已全部标注的集合重复调用返回空。
pub fn unlabeled_indices(records: &[PromptRecord]) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.needs_label())
        .map(|(idx, _)| idx)
        .collect()
}
