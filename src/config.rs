/// 程序配置
///
/// 引擎不读任何全局状态，所有参数在构造时显式注入。
#[derive(Clone, Debug)]
pub struct Config {
    /// 记录 TOML 文件存放目录
    pub records_folder: String,
    /// 输出日志文件
    pub output_log_file: String,
    /// 并发模式下同时进行的标注数量上限
    pub max_concurrency: usize,
    /// 不超过该数量时使用顺序模式
    pub sync_threshold: usize,
    /// 不超过该数量时使用并发模式，超过则提交远程批量任务
    pub concurrent_threshold: usize,
    /// 批量任务轮询间隔（秒）
    pub poll_interval_secs: u64,
    /// 批量任务最长等待时间（秒）
    pub batch_max_wait_secs: u64,
    /// 标签最大长度，启发式兜底按此截断
    pub label_max_len: usize,
    // --- 主力云端 LLM 配置 ---
    pub primary_api_key: String,
    pub primary_api_base_url: String,
    pub primary_model_name: String,
    // --- 备用云端 LLM 配置 ---
    pub secondary_api_key: String,
    pub secondary_api_base_url: String,
    pub secondary_model_name: String,
    // --- 本地 LLM（LM Studio 等 OpenAI 兼容服务）---
    pub local_api_base_url: String,
    pub local_model_name: String,
    // --- 远程批量任务 API 配置 ---
    pub batch_api_key: String,
    pub batch_api_base_url: String,
    pub batch_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            records_folder: "records_toml".to_string(),
            output_log_file: "label_run.txt".to_string(),
            max_concurrency: 8,
            sync_threshold: 50,
            concurrent_threshold: 1000,
            poll_interval_secs: 10,
            batch_max_wait_secs: 3600,
            label_max_len: 30,
            primary_api_key: String::new(),
            primary_api_base_url: "https://api.openai.com/v1".to_string(),
            primary_model_name: "gpt-4o-mini".to_string(),
            secondary_api_key: String::new(),
            secondary_api_base_url: "https://open.bigmodel.cn/api/paas/v4".to_string(),
            secondary_model_name: "glm-4-flash".to_string(),
            local_api_base_url: String::new(),
            local_model_name: "local-model".to_string(),
            batch_api_key: String::new(),
            batch_api_base_url: "https://api.anthropic.com".to_string(),
            batch_model_name: "claude-3-haiku-20240307".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            records_folder: std::env::var("RECORDS_FOLDER").unwrap_or(default.records_folder),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            max_concurrency: std::env::var("MAX_CONCURRENCY").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrency),
            sync_threshold: std::env::var("SYNC_THRESHOLD").ok().and_then(|v| v.parse().ok()).unwrap_or(default.sync_threshold),
            concurrent_threshold: std::env::var("CONCURRENT_THRESHOLD").ok().and_then(|v| v.parse().ok()).unwrap_or(default.concurrent_threshold),
            poll_interval_secs: std::env::var("POLL_INTERVAL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.poll_interval_secs),
            batch_max_wait_secs: std::env::var("BATCH_MAX_WAIT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.batch_max_wait_secs),
            label_max_len: std::env::var("LABEL_MAX_LEN").ok().and_then(|v| v.parse().ok()).unwrap_or(default.label_max_len),
            primary_api_key: std::env::var("PRIMARY_API_KEY").unwrap_or(default.primary_api_key),
            primary_api_base_url: std::env::var("PRIMARY_API_BASE_URL").unwrap_or(default.primary_api_base_url),
            primary_model_name: std::env::var("PRIMARY_MODEL_NAME").unwrap_or(default.primary_model_name),
            secondary_api_key: std::env::var("SECONDARY_API_KEY").unwrap_or(default.secondary_api_key),
            secondary_api_base_url: std::env::var("SECONDARY_API_BASE_URL").unwrap_or(default.secondary_api_base_url),
            secondary_model_name: std::env::var("SECONDARY_MODEL_NAME").unwrap_or(default.secondary_model_name),
            local_api_base_url: std::env::var("LOCAL_API_BASE_URL").unwrap_or(default.local_api_base_url),
            local_model_name: std::env::var("LOCAL_MODEL_NAME").unwrap_or(default.local_model_name),
            batch_api_key: std::env::var("BATCH_API_KEY").unwrap_or(default.batch_api_key),
            batch_api_base_url: std::env::var("BATCH_API_BASE_URL").unwrap_or(default.batch_api_base_url),
            batch_model_name: std::env::var("BATCH_MODEL_NAME").unwrap_or(default.batch_model_name),
        }
    }
}
