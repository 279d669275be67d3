use std::io;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use uuid::Uuid;

use super::fingerprint::CacheKey;

/// 持久化结果：成功时返回写入位置；失败不抛错，由调用方直接返回新编码的字节。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Stored(PathBuf),
    Failed,
}

/// 一次请求最终得到的图片产物
#[derive(Debug, Clone)]
pub struct CachedArtifact {
    pub bytes: Bytes,
    /// 写入的缓存位置；持久化失败时为 `None`
    pub location: Option<PathBuf>,
}

/// 基于目录的内容寻址缓存：每个键一个文件 `<root>/<key>`，只创建与读取，从不修改。
///
/// 无淘汰/过期策略，目录会随不同请求数量单调增长。
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    root: PathBuf,
}

impl ArtifactCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 键对应的确定性存储位置
    pub fn location(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    /// 读取缓存；不存在与不可读同样视为未命中。
    pub async fn get(&self, key: &CacheKey) -> Option<Bytes> {
        let path = self.location(key);
        match tokio::fs::read(&path).await {
            Ok(data) if !data.is_empty() => Some(Bytes::from(data)),
            Ok(_) => {
                tracing::warn!("缓存文件为空，按未命中处理: {:?}", path);
                None
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("读取缓存失败 {:?}: {}", path, e);
                None
            }
        }
    }

    /// 尽力写入缓存。先写同目录临时文件再 rename，读者不会看到半截文件；
    /// 并发写同一个键时内容相同，后完成的 rename 覆盖即可。
    pub async fn put(&self, key: &CacheKey, bytes: &[u8]) -> PersistOutcome {
        let target = self.location(key);
        match self.write_atomic(key, &target, bytes).await {
            Ok(()) => PersistOutcome::Stored(target),
            Err(e) => {
                tracing::warn!("写入缓存失败 {:?}: {}（将直接返回渲染结果）", target, e);
                PersistOutcome::Failed
            }
        }
    }

    async fn write_atomic(&self, key: &CacheKey, target: &Path, bytes: &[u8]) -> io::Result<()> {
        let meta = tokio::fs::metadata(&self.root).await?;
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                "cache root is not a directory",
            ));
        }
        if meta.permissions().readonly() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "cache root is read-only",
            ));
        }

        let tmp = self
            .root
            .join(format!(".{}.{}.tmp", key.as_str(), Uuid::new_v4().simple()));
        if let Err(e) = tokio::fs::write(&tmp, bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&tmp, target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }
}
