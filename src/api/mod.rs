//! API 模块
//!
//! 负责与远程批量标注服务的交互

pub mod batch;

pub use batch::{
    BatchApi, BatchApiError, BatchOutcome, BatchRequestItem, BatchResultItem, BatchStatus,
    BatchStatusReport, HttpBatchClient,
};
