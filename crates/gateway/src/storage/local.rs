//! ローカルディレクトリへの画像保存。

use std::io::ErrorKind;
use std::path::PathBuf;

use super::ImageStore;
use crate::error::GatewayError;

/// 単一ディレクトリにフラットに保存する `ImageStore` 実装。
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait::async_trait]
impl ImageStore for LocalImageStore {
    async fn put(&self, filename: &str, data: &[u8]) -> Result<(), GatewayError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| GatewayError::Storage(format!("ディレクトリ作成失敗: {e}")))?;

        let path = self.root.join(filename);
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| GatewayError::Storage(format!("書き込み失敗 {}: {e}", path.display())))
    }

    async fn list(&self) -> Result<Vec<String>, GatewayError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            // 未作成のディレクトリは空として扱う
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(GatewayError::Storage(format!("一覧取得失敗: {e}"))),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| GatewayError::Storage(format!("一覧取得失敗: {e}")))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}
