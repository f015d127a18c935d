//! 文本处理工具
//!
//! 标签清洗、截断与自动标签词提取。

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// 截断长文本，超长时追加省略号
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

/// 清洗 LLM 返回的标签
///
/// 去掉换行符和首尾引号，模型偶尔会把标签包在引号里返回。
pub fn sanitize_label(raw: &str) -> String {
    let no_newlines: String = raw.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    no_newlines
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .trim()
        .to_string()
}

fn word_splitter() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[,_\s]+").expect("分词正则必定合法"))
}

/// 自动提取标签词
///
/// 小写化后按逗号、下划线、空白分词，丢弃单字符和含符号的词，
/// 去重保序，最多返回 10 个。
///
/// # 示例
/// ```
/// use auto_labeler::utils::text::generate_tags_auto;
///
/// assert_eq!(generate_tags_auto("school_infirmary"), vec!["school", "infirmary"]);
/// assert_eq!(
///     generate_tags_auto("classroom interior, desks in rows"),
///     vec!["classroom", "interior", "desks", "in", "rows"]
/// );
/// ```
pub fn generate_tags_auto(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut seen = HashSet::new();
    let mut tags = Vec::new();

    for word in word_splitter().split(&lowered) {
        let word = word.trim();
        if word.chars().count() <= 1 || !word.chars().all(|c| c.is_alphanumeric()) {
            continue;
        }
        if seen.insert(word.to_string()) {
            tags.push(word.to_string());
        }
        if tags.len() == 10 {
            break;
        }
    }

    tags
}
