//! 标签供应商 - 业务能力层
//!
//! ## 职责
//!
//! 每个供应商只描述"我能不能标、怎么标一条文本"，不关心批量和流程。
//! 回退链按优先级逐个尝试这里注册的供应商。
//!
//! ## 模块划分
//!
//! - `llm` - OpenAI 兼容的 LLM 供应商（云端与本地共用一套实现）
//! - `heuristic` - 确定性启发式兜底，截断文本开头作为标签
//!
//! 超时、重试等传输层问题完全由供应商内部消化，对回退链只表现为
//! 成功或失败两种结果。

pub mod heuristic;
pub mod llm;

pub use heuristic::HeuristicProvider;
pub use llm::{LlmProvider, LABEL_SYSTEM_PROMPT};

use async_trait::async_trait;

use crate::config::Config;
use crate::error::ProviderError;

/// 标签供应商统一接口
///
/// 显式的多态列表取代布尔开关链：每个供应商自带优先级与可用性判断，
/// 回退链对它们一视同仁地迭代。
#[async_trait]
pub trait LabelProvider: Send + Sync {
    /// 供应商名称，用于日志与错误信息
    fn name(&self) -> &str;

    /// 优先级，数字越小越先尝试
    fn priority(&self) -> u8;

    /// 当前是否可用（未配置 API Key 等情况返回 false）
    fn is_available(&self) -> bool;

    /// 尝试为一条文本生成标签
    async fn try_label(&self, text: &str) -> Result<String, ProviderError>;
}

/// 按配置构造回退链的供应商列表
///
/// 顺序固定：主力云端 → 备用云端 → 本地 LLM → 启发式兜底。
/// 同时配置多个供应商时采用"先配置者优先"策略，不做质量仲裁。
pub fn build_provider_chain(config: &Config) -> Vec<Box<dyn LabelProvider>> {
    vec![
        Box::new(LlmProvider::new(
            "主力云端",
            0,
            &config.primary_api_key,
            &config.primary_api_base_url,
            &config.primary_model_name,
            true,
        )),
        Box::new(LlmProvider::new(
            "备用云端",
            1,
            &config.secondary_api_key,
            &config.secondary_api_base_url,
            &config.secondary_model_name,
            true,
        )),
        Box::new(LlmProvider::new(
            "本地LLM",
            2,
            "lm-studio",
            &config.local_api_base_url,
            &config.local_model_name,
            false,
        )),
        Box::new(HeuristicProvider::new(3, config.label_max_len)),
    ]
}
