//! Short-lived persistence for the session id.
//!
//! Each surface keeps exactly one id under its own key. Nothing else about a
//! conversation is ever persisted.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ChatError, ChatResult};

/// 会话标识存储 trait
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 读取键下保存的会话标识
    async fn load(&self, key: &str) -> ChatResult<Option<String>>;

    /// 保存会话标识，覆盖旧值
    async fn save(&self, key: &str, session_id: &str) -> ChatResult<()>;

    /// 删除键下的会话标识
    async fn remove(&self, key: &str) -> ChatResult<()>;
}

/// Process-lifetime store, the analogue of a browser tab's session storage.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store, as after a page reload
    pub fn with_entry(key: impl Into<String>, session_id: impl Into<String>) -> Self {
        let store = Self::new();
        store.entries.write().insert(key.into(), session_id.into());
        store
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, key: &str) -> ChatResult<Option<String>> {
        Ok(self.get(key))
    }

    async fn save(&self, key: &str, session_id: &str) -> ChatResult<()> {
        self.entries
            .write()
            .insert(key.to_string(), session_id.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> ChatResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// One small file per storage key under a shared directory, so a restarted
/// surface resumes its conversation.
///
/// The mobile and PC surfaces may run as separate processes. Each writes only
/// its own file, so neither can clobber the other's id.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`; keys double as file names
    pub fn path_for(&self, key: &str) -> ChatResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(ChatError::storage(format!("invalid storage key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.session", key)))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, key: &str) -> ChatResult<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let id = content.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, key: &str, session_id: &str) -> ChatResult<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        // 先写临时文件再重命名，避免读到半截内容
        let tmp = path.with_extension(format!("session.{}.tmp", std::process::id()));
        tokio::fs::write(&tmp, session_id).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> ChatResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_memory_store_overwrites() {
        let store = MemorySessionStore::new();
        assert_eq!(store.load("chat_session_id").await.unwrap(), None);

        store.save("chat_session_id", "S1").await.unwrap();
        store.save("chat_session_id", "S2").await.unwrap();
        assert_eq!(store.load("chat_session_id").await.unwrap().as_deref(), Some("S2"));

        store.remove("chat_session_id").await.unwrap();
        assert_eq!(store.get("chat_session_id"), None);
    }

    #[tokio::test]
    async fn test_file_store_keeps_keys_apart() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("state").join("sessions");
        let store = FileSessionStore::new(&dir);

        assert_ok!(store.save("chat_session_id", "mobile-1").await);
        assert_ok!(store.save("pc_chat_session_id", "pc-1").await);

        let reopened = FileSessionStore::new(&dir);
        assert_eq!(
            reopened.load("chat_session_id").await.unwrap().as_deref(),
            Some("mobile-1")
        );
        assert_eq!(
            reopened.load("pc_chat_session_id").await.unwrap().as_deref(),
            Some("pc-1")
        );

        reopened.remove("chat_session_id").await.unwrap();
        assert_ok!(reopened.remove("chat_session_id").await);
        assert_eq!(store.load("chat_session_id").await.unwrap(), None);
        assert_eq!(
            store.load("pc_chat_session_id").await.unwrap().as_deref(),
            Some("pc-1")
        );
    }

    #[tokio::test]
    async fn test_two_processes_writing_different_keys_do_not_clobber() {
        let temp_dir = TempDir::new().unwrap();
        // independent handles stand in for the two surfaces
        let mobile = FileSessionStore::new(temp_dir.path());
        let pc = FileSessionStore::new(temp_dir.path());

        assert_eq!(mobile.load("chat_session_id").await.unwrap(), None);
        assert_eq!(pc.load("pc_chat_session_id").await.unwrap(), None);

        let (a, b) = tokio::join!(
            mobile.save("chat_session_id", "mobile-1"),
            pc.save("pc_chat_session_id", "pc-1"),
        );
        assert_ok!(a);
        assert_ok!(b);
        assert_ok!(pc.remove("pc_chat_session_id").await);
        assert_ok!(pc.save("pc_chat_session_id", "pc-2").await);

        assert_eq!(
            pc.load("chat_session_id").await.unwrap().as_deref(),
            Some("mobile-1")
        );
        assert_eq!(
            mobile.load("pc_chat_session_id").await.unwrap().as_deref(),
            Some("pc-2")
        );
    }

    #[tokio::test]
    async fn test_file_store_rejects_path_like_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp_dir.path());

        let err = assert_err!(store.save("../escape", "S1").await);
        assert!(matches!(err, ChatError::Storage(_)));
        assert_err!(store.load("").await);
    }

    #[tokio::test]
    async fn test_blank_file_reads_as_missing() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp_dir.path());
        tokio::fs::write(store.path_for("chat_session_id").unwrap(), " \n")
            .await
            .unwrap();

        assert_eq!(store.load("chat_session_id").await.unwrap(), None);
        assert_ok!(store.save("chat_session_id", "fresh").await);
        assert_eq!(
            store.load("chat_session_id").await.unwrap().as_deref(),
            Some("fresh")
        );
    }
}
