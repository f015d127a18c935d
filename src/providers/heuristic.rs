//! 确定性启发式供应商（最终兜底层）
//!
//! 截取文本开头作为标签，截断时追加省略号。不依赖任何外部服务，
//! 对非空输入必定成功，保证回退链整体是全函数。

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::providers::LabelProvider;
use crate::utils::text::truncate_text;

pub struct HeuristicProvider {
    priority: u8,
    max_len: usize,
}

impl HeuristicProvider {
    pub fn new(priority: u8, max_len: usize) -> Self {
        Self { priority, max_len }
    }
}

#[async_trait]
impl LabelProvider for HeuristicProvider {
    fn name(&self) -> &str {
        "启发式"
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn try_label(&self, text: &str) -> Result<String, ProviderError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ProviderError::EmptyLabel {
                provider: "启发式".to_string(),
            });
        }
        Ok(truncate_text(trimmed, self.max_len))
    }
}
