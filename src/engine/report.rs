//! 运行结果汇总
//!
//! 三种执行模式共用同一形状的报告，调用方不需要关心本次运行
//! 实际走了哪条路径。

/// 一次运行的统计结果
///
/// 不变式：运行结束时 `success_count + failure_count` 等于被选中
/// 记录的数量。错误信息按发生顺序追加，不去重。
#[derive(Clone, Debug, Default)]
pub struct RunReport {
    pub success_count: usize,
    pub failure_count: usize,
    pub errors: Vec<String>,
}

impl RunReport {
    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.failure_count += 1;
        self.errors.push(message.into());
    }

    /// 整批失败：未完成的记录全部计为失败，只追加一条汇总错误
    pub fn record_job_failure(&mut self, outstanding: usize, message: impl Into<String>) {
        self.failure_count += outstanding;
        self.errors.push(message.into());
    }

    pub fn total(&self) -> usize {
        self.success_count + self.failure_count
    }

    /// 合并另一份报告（跨文件汇总用）
    pub fn merge(&mut self, other: RunReport) {
        self.success_count += other.success_count;
        self.failure_count += other.failure_count;
        self.errors.extend(other.errors);
    }
}
