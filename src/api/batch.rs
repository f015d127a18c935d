//! 远程批量任务 API 客户端
//!
//! 封装批量标注服务的三个动作：提交、轮询、取结果。
//! 接口形状对齐 Anthropic Message Batches 风格：提交一组带
//! `custom_id` 的请求，轮询 `processing_status`，结束后取回
//! JSONL 结果流并按 `custom_id` 对号入座。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::providers::LABEL_SYSTEM_PROMPT;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const LABEL_MAX_TOKENS: u32 = 50;

/// 批量任务状态
///
/// 六态词汇表，状态单调推进不回退。`TimedOut` 是本地视角的状态：
/// 等待超时、或服务端返回了词汇表之外的状态时防御性落入。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchStatus {
    Submitted,
    Processing,
    Ended,
    Canceled,
    Expired,
    TimedOut,
}

impl BatchStatus {
    /// 是否为终止状态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchStatus::Ended | BatchStatus::Canceled | BatchStatus::Expired | BatchStatus::TimedOut
        )
    }

    /// 解析服务端返回的状态字符串
    ///
    /// 词汇表之外的任何状态一律按 `TimedOut` 防御处理。
    pub fn from_remote(status: &str) -> Self {
        match status {
            "submitted" => BatchStatus::Submitted,
            "in_progress" | "processing" | "canceling" => BatchStatus::Processing,
            "ended" => BatchStatus::Ended,
            "canceled" | "cancelled" => BatchStatus::Canceled,
            "expired" => BatchStatus::Expired,
            other => {
                warn!("未知的批量任务状态: {}，按超时处理", other);
                BatchStatus::TimedOut
            }
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BatchStatus::Submitted => "已提交",
            BatchStatus::Processing => "处理中",
            BatchStatus::Ended => "已完成",
            BatchStatus::Canceled => "已取消",
            BatchStatus::Expired => "已过期",
            BatchStatus::TimedOut => "已超时",
        };
        write!(f, "{}", text)
    }
}

/// 提交给批量 API 的单条请求
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchRequestItem {
    /// 关联 ID，结果按它找回原始记录
    pub custom_id: String,
    /// 待标注文本
    pub text: String,
}

/// 单条结果
#[derive(Clone, Debug)]
pub struct BatchResultItem {
    pub custom_id: String,
    pub outcome: BatchOutcome,
}

#[derive(Clone, Debug)]
pub enum BatchOutcome {
    /// 标注成功，携带标签文本
    Succeeded(String),
    /// 该条请求在服务端失败
    Errored(String),
}

/// 轮询返回的状态与进度计数
#[derive(Clone, Debug)]
pub struct BatchStatusReport {
    pub status: BatchStatus,
    pub succeeded: Option<usize>,
    pub errored: Option<usize>,
    pub processing: Option<usize>,
}

/// 批量 API 调用错误
#[derive(Debug, Error)]
pub enum BatchApiError {
    #[error("批量任务请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("批量任务响应格式异常: {0}")]
    MalformedResponse(String),
}

/// 远程批量任务 API 契约
///
/// 执行器只依赖这三个动作，测试里用脚本化替身实现。
#[async_trait]
pub trait BatchApi: Send + Sync {
    /// 提交一批请求，返回任务 ID
    async fn submit(&self, requests: &[BatchRequestItem]) -> Result<String, BatchApiError>;

    /// 查询任务状态与进度
    async fn poll_status(&self, job_id: &str) -> Result<BatchStatusReport, BatchApiError>;

    /// 取回全部结果（任务结束后调用）
    async fn fetch_results(&self, job_id: &str) -> Result<Vec<BatchResultItem>, BatchApiError>;
}

/// 基于 HTTP 的批量任务客户端
pub struct HttpBatchClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model_name: String,
}

impl HttpBatchClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.batch_api_base_url.trim_end_matches('/').to_string(),
            api_key: config.batch_api_key.clone(),
            model_name: config.batch_model_name.clone(),
        }
    }

    fn endpoint(&self, suffix: &str) -> String {
        format!("{}/v1/messages/batches{}", self.base_url, suffix)
    }

    fn request_failed(endpoint: &str, source: reqwest::Error) -> BatchApiError {
        BatchApiError::RequestFailed {
            endpoint: endpoint.to_string(),
            source,
        }
    }
}

#[async_trait]
impl BatchApi for HttpBatchClient {
    async fn submit(&self, requests: &[BatchRequestItem]) -> Result<String, BatchApiError> {
        let endpoint = self.endpoint("");

        let payload = json!({
            "requests": requests
                .iter()
                .map(|req| {
                    json!({
                        "custom_id": req.custom_id,
                        "params": {
                            "model": self.model_name,
                            "max_tokens": LABEL_MAX_TOKENS,
                            "system": LABEL_SYSTEM_PROMPT,
                            "messages": [
                                { "role": "user", "content": format!("文本: {}\n\n标签:", req.text) }
                            ],
                        }
                    })
                })
                .collect::<Vec<_>>()
        });

        debug!("提交批量任务: {} 条请求", requests.len());

        let body: Value = self
            .http
            .post(&endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Self::request_failed(&endpoint, e))?
            .json()
            .await
            .map_err(|e| Self::request_failed(&endpoint, e))?;

        body.get("id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| BatchApiError::MalformedResponse("提交响应缺少任务 ID".to_string()))
    }

    async fn poll_status(&self, job_id: &str) -> Result<BatchStatusReport, BatchApiError> {
        let endpoint = self.endpoint(&format!("/{}", job_id));

        let body: Value = self
            .http
            .get(&endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send()
            .await
            .map_err(|e| Self::request_failed(&endpoint, e))?
            .json()
            .await
            .map_err(|e| Self::request_failed(&endpoint, e))?;

        let status = body
            .get("processing_status")
            .and_then(|v| v.as_str())
            .map(BatchStatus::from_remote)
            .ok_or_else(|| {
                BatchApiError::MalformedResponse("状态响应缺少 processing_status".to_string())
            })?;

        let counts = body.get("request_counts");
        let count = |key: &str| {
            counts
                .and_then(|c| c.get(key))
                .and_then(|v| v.as_u64())
                .map(|v| v as usize)
        };

        Ok(BatchStatusReport {
            status,
            succeeded: count("succeeded"),
            errored: count("errored"),
            processing: count("processing"),
        })
    }

    async fn fetch_results(&self, job_id: &str) -> Result<Vec<BatchResultItem>, BatchApiError> {
        let endpoint = self.endpoint(&format!("/{}/results", job_id));

        let body = self
            .http
            .get(&endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send()
            .await
            .map_err(|e| Self::request_failed(&endpoint, e))?
            .text()
            .await
            .map_err(|e| Self::request_failed(&endpoint, e))?;

        Ok(parse_results_body(&body))
    }
}

/// 解析 JSONL 结果流
///
/// 单行异常只告警跳过，一条坏响应不会中断整体分发；
/// 对应的记录会因为结果缺失而被计为单条失败。
pub fn parse_results_body(body: &str) -> Vec<BatchResultItem> {
    let mut items = Vec::new();

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!("跳过无法解析的结果行: {}", e);
                continue;
            }
        };

        let Some(custom_id) = value.get("custom_id").and_then(|v| v.as_str()) else {
            warn!("结果行缺少 custom_id，已跳过");
            continue;
        };

        let outcome = match value.pointer("/result/type").and_then(|v| v.as_str()) {
            Some("succeeded") => {
                let text = value
                    .pointer("/result/message/content/0/text")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                BatchOutcome::Succeeded(text.to_string())
            }
            Some(other) => {
                let detail = value
                    .pointer("/result/error/message")
                    .and_then(|v| v.as_str())
                    .unwrap_or(other);
                BatchOutcome::Errored(detail.to_string())
            }
            None => BatchOutcome::Errored("结果行缺少 result.type".to_string()),
        };

        items.push(BatchResultItem {
            custom_id: custom_id.to_string(),
            outcome,
        });
    }

    items
}
