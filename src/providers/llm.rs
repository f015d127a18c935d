//! LLM 标签供应商
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（云端网关、LM Studio 本地服务等）
//!
//! 云端和本地供应商共用本实现，区别只在端点配置和是否要求 API Key。

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::providers::LabelProvider;
use crate::utils::text::sanitize_label;

/// 标签生成的系统提示词
pub const LABEL_SYSTEM_PROMPT: &str = "你是一个为自由文本记录生成简短标签的助手。请遵守以下规则：\n\
1. 用 3-8 个字概括最核心的内容\n\
2. 使用平易的中文（可混用常见英文词）\n\
3. 只输出标签本身，不要任何解释\n\
\n\
例：\n\
- \"school infirmary, beds with curtain dividers\" → \"保健室\"\n\
- \"classroom interior, desks in rows\" → \"教室\"";

/// OpenAI 兼容的 LLM 供应商
pub struct LlmProvider {
    name: String,
    priority: u8,
    client: Client<OpenAIConfig>,
    model_name: String,
    available: bool,
}

impl LlmProvider {
    /// 创建 LLM 供应商
    ///
    /// # 参数
    /// - `name`: 供应商名称（日志用）
    /// - `priority`: 回退链中的优先级
    /// - `require_key`: 为 true 时 API Key 为空即视为未配置；
    ///   LM Studio 类本地服务不校验 Key，传 false
    pub fn new(
        name: impl Into<String>,
        priority: u8,
        api_key: &str,
        base_url: &str,
        model_name: &str,
        require_key: bool,
    ) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);

        let available =
            !base_url.is_empty() && !model_name.is_empty() && (!require_key || !api_key.is_empty());

        Self {
            name: name.into(),
            priority,
            client: Client::with_config(openai_config),
            model_name: model_name.to_string(),
            available,
        }
    }

    fn call_failed(&self, detail: impl std::fmt::Display) -> ProviderError {
        ProviderError::CallFailed {
            provider: self.name.clone(),
            detail: detail.to_string(),
        }
    }
}

#[async_trait]
impl LabelProvider for LlmProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn try_label(&self, text: &str) -> Result<String, ProviderError> {
        if !self.available {
            return Err(ProviderError::Unavailable {
                provider: self.name.clone(),
            });
        }

        debug!("调用 {} 生成标签，模型: {}", self.name, self.model_name);

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(LABEL_SYSTEM_PROMPT)
            .build()
            .map_err(|e| self.call_failed(e))?;

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(format!("文本: {}\n\n标签:", text))
            .build()
            .map_err(|e| self.call_failed(e))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(0.3)
            .max_tokens(50u32)
            .build()
            .map_err(|e| self.call_failed(e))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("{} API 调用失败: {}", self.name, e);
            self.call_failed(e)
        })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| ProviderError::EmptyLabel {
                provider: self.name.clone(),
            })?;

        let label = sanitize_label(&content);
        if label.is_empty() {
            return Err(ProviderError::EmptyLabel {
                provider: self.name.clone(),
            });
        }

        debug!("{} 生成标签: {}", self.name, label);
        Ok(label)
    }
}
