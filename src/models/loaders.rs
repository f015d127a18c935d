use crate::models::record::RecordFile;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载记录集合
pub async fn load_record_file(path: &Path) -> Result<RecordFile> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", path.display()))?;

    let mut file: RecordFile = toml::from_str(&content)
        .with_context(|| format!("无法解析TOML文件: {}", path.display()))?;

    // 记录来源路径，保存时写回原文件
    file.file_path = Some(path.to_string_lossy().to_string());

    Ok(file)
}

/// 从文件夹中加载所有 TOML 记录文件
///
/// 单个文件解析失败只告警跳过，不中断整体加载。
pub async fn load_all_record_files(folder_path: &str) -> Result<Vec<RecordFile>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut record_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            tracing::info!(
                "正在加载: {}",
                path.file_name().unwrap_or_default().to_string_lossy()
            );

            match load_record_file(&path).await {
                Ok(file) => {
                    tracing::info!("成功加载 {} 条记录", file.records.len());
                    record_files.push(file);
                }
                Err(e) => {
                    tracing::warn!("加载文件失败 {}: {}", path.display(), e);
                }
            }
        }
    }

    Ok(record_files)
}

/// 将记录集合写回其来源文件
pub async fn save_record_file(file: &RecordFile) -> Result<()> {
    let path = file
        .file_path
        .as_ref()
        .context("记录文件缺少来源路径，无法保存")?;

    let content = toml::to_string_pretty(file).context("序列化记录文件失败")?;

    fs::write(path, content)
        .await
        .with_context(|| format!("写入文件失败: {}", path))?;

    Ok(())
}
