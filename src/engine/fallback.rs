//! 多级回退链
//!
//! 按优先级依次尝试各供应商，直到有一个产出标签。供应商的任何
//! 调用异常或空白结果都被吞掉换下一级；链的最后一级是确定性启发
//! 式兜底，所以对非空输入整条链必定成功。调用方拿到标签和产出它
//! 的层级名称，除此之外无法区分"主力成功"和"兜底救场"。

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ItemError, LabelError};
use crate::providers::{build_provider_chain, LabelProvider};
use crate::utils::text::truncate_text;

/// 单条标注成功的结果
#[derive(Clone, Debug)]
pub struct LabeledOutcome {
    /// 生成的标签
    pub label: String,
    /// 产出标签的供应商名称
    pub provider: String,
}

pub struct FallbackChain {
    providers: Vec<Box<dyn LabelProvider>>,
}

impl FallbackChain {
    /// 创建回退链，供应商按优先级排序
    pub fn new(mut providers: Vec<Box<dyn LabelProvider>>) -> Self {
        providers.sort_by_key(|p| p.priority());
        Self { providers }
    }

    /// 按配置构造真实供应商链
    pub fn from_config(config: &Config) -> Self {
        Self::new(build_provider_chain(config))
    }

    /// 为单条文本生成标签
    ///
    /// 空白文本是唯一的单条失败来源；只要文本非空且链里有启发式
    /// 兜底，本方法必定成功。
    pub async fn label_one(&self, text: &str) -> Result<LabeledOutcome, LabelError> {
        if text.trim().is_empty() {
            return Err(ItemError::EmptyText.into());
        }

        for provider in &self.providers {
            if !provider.is_available() {
                debug!("跳过不可用的供应商: {}", provider.name());
                continue;
            }

            match provider.try_label(text).await {
                Ok(label) if !label.trim().is_empty() => {
                    debug!("{} 产出标签: {}", provider.name(), label);
                    return Ok(LabeledOutcome {
                        label,
                        provider: provider.name().to_string(),
                    });
                }
                Ok(_) => {
                    warn!("{} 返回空白标签，换下一级", provider.name());
                }
                Err(e) => {
                    warn!("{}", e);
                }
            }
        }

        // 正常配置下链尾是启发式兜底，走到这里说明链被构造成了全云端
        Err(ItemError::AllTiersFailed {
            preview: truncate_text(text, 30),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::providers::HeuristicProvider;
    use async_trait::async_trait;

    /// 始终失败的测试供应商
    struct FailingProvider {
        priority: u8,
        available: bool,
    }

    #[async_trait]
    impl LabelProvider for FailingProvider {
        fn name(&self) -> &str {
            "测试失败供应商"
        }

        fn priority(&self) -> u8 {
            self.priority
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn try_label(&self, _text: &str) -> Result<String, ProviderError> {
            Err(ProviderError::CallFailed {
                provider: "测试失败供应商".to_string(),
                detail: "模拟故障".to_string(),
            })
        }
    }

    fn chain_with_failures() -> FallbackChain {
        FallbackChain::new(vec![
            Box::new(FailingProvider {
                priority: 0,
                available: true,
            }),
            Box::new(FailingProvider {
                priority: 1,
                available: false,
            }),
            Box::new(HeuristicProvider::new(2, 30)),
        ])
    }

    #[tokio::test]
    async fn test_falls_through_to_heuristic() {
        let chain = chain_with_failures();
        let outcome = chain
            .label_one("school infirmary, beds with curtain dividers")
            .await
            .expect("链尾兜底必定成功");

        assert_eq!(outcome.provider, "启发式");
        assert_eq!(outcome.label, "school infirmary, beds with cu...");
    }

    #[tokio::test]
    async fn test_blank_text_fails() {
        let chain = chain_with_failures();
        let result = chain.label_one("   ").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_total_over_non_empty_input() {
        let chain = chain_with_failures();
        for text in ["x", "教室", "a, b, c", &"long ".repeat(100)] {
            assert!(chain.label_one(text).await.is_ok(), "输入 {:?} 应当成功", text);
        }
    }

    #[tokio::test]
    async fn test_all_cloud_chain_reports_all_tiers_failed() {
        // 没有兜底层的链：所有层级失败时返回单条失败
        let chain = FallbackChain::new(vec![Box::new(FailingProvider {
            priority: 0,
            available: true,
        })]);

        let result = chain.label_one("classroom interior").await;
        assert!(matches!(
            result,
            Err(LabelError::Item(ItemError::AllTiersFailed { .. }))
        ));
    }
}
