use serde::{Deserialize, Serialize};

/// 标签来源
///
/// 引擎自身只会写入 `AiGenerated`；另外两个值由人工编辑或
/// 导入流程写入，引擎读到后原样保留。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    /// AI 生成
    AiGenerated,
    /// 人工录入
    ManualEntry,
    /// 自动提取
    AutoExtracted,
}

/// 待标注的提示词记录
///
/// 一次运行中每条记录至多被一个任务修改，不需要逐条加锁。
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromptRecord {
    /// 记录标识
    pub id: String,
    /// 自由文本内容
    pub text: String,
    /// 简短标签，缺失时由引擎生成
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// 标签来源
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_source: Option<LabelSource>,
    /// 自动提取的标签词
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl PromptRecord {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            label: None,
            label_source: None,
            tags: Vec::new(),
        }
    }

    /// 是否需要生成标签
    ///
    /// 标签缺失、为空白、或者等于原始文本（导入时的占位写法）都算缺标签。
    pub fn needs_label(&self) -> bool {
        match &self.label {
            None => true,
            Some(label) => label.trim().is_empty() || label == &self.text,
        }
    }

    /// 写入生成的标签，来源固定为 AI 生成
    pub fn apply_label(&mut self, label: String) {
        self.label = Some(label);
        self.label_source = Some(LabelSource::AiGenerated);
    }
}

/// 一个 TOML 记录文件（包含多条记录）
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordFile {
    /// 文件标题
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// 记录列表
    #[serde(default)]
    pub records: Vec<PromptRecord>,
    /// 来源文件路径，加载时填充
    #[serde(skip)]
    pub file_path: Option<String>,
}
