//! # Auto Labeler
//!
//! 一个为自由文本记录批量生成简短标签的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 能力层（Providers / Api）
//! - `providers/` - 标签供应商：云端 LLM、本地 LLM、启发式兜底
//! - `api/` - 远程批量任务客户端（提交 / 轮询 / 取结果）
//!
//! ### ② 编排层（Engine）
//! - `engine/` - 筛选目标、选择执行模式、调度三种执行器
//! - 顺序模式（小批量）、有界并发模式（中批量）、远程批量模式（大批量）
//!
//! ### ③ 数据层（Models）
//! - `models/` - 记录与标签来源的类型定义、TOML 加载与保存
//!
//! ### ④ 支撑层（Config / Error / Utils）
//! - `config` - 显式注入的配置，不读全局状态
//! - `error` - 四类错误边界：供应商 / 单条 / 整批 / 未预期
//! - `utils` - 日志与文本工具
//!
//! ## 模块结构

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod providers;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use engine::{
    ExecutionMode, FallbackChain, LabelEngine, ProgressCallback, RunReport,
};
pub use error::{ItemError, JobError, LabelError, ProviderError};
pub use models::{LabelSource, PromptRecord, RecordFile};
pub use providers::{HeuristicProvider, LabelProvider, LlmProvider};
