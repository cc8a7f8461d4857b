use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use tilgen_logging::ensure_dir;
use tilgen_types::{Checkpoint, Message};

use crate::store::{MessageStore, StoreError};

/// Longest encoded stem used verbatim; longer keys are stored under a digest
const MAX_STEM_LEN: usize = 200;

/// Store keeping one JSON checkpoint file per session
pub struct FileStore {
    sessions_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a file store rooted at `sessions_dir` (`~` expanded, created if missing)
    pub fn new<P: AsRef<Path>>(sessions_dir: P) -> Result<Self, StoreError> {
        let sessions_dir =
            ensure_dir(sessions_dir.as_ref()).map_err(|e| StoreError::Unavailable(format!("{:#}", e)))?;

        Ok(Self {
            sessions_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    /// Encode a session key into a file name. `[A-Za-z0-9-]` pass through,
    /// every other byte becomes `_xx` so distinct keys never collide.
    ///
    /// Stems longer than [`MAX_STEM_LEN`] become `sha256.<hex>`. The escaped
    /// form never contains `.`, so the two naming schemes cannot overlap.
    fn file_stem(session_key: &str) -> String {
        let mut stem = String::with_capacity(session_key.len());
        for byte in session_key.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                stem.push(byte as char);
            } else {
                stem.push_str(&format!("_{:02x}", byte));
            }
        }

        if stem.len() > MAX_STEM_LEN {
            let digest = Sha256::digest(session_key.as_bytes());
            stem = format!("sha256.{}", hex::encode(digest));
        }
        stem
    }

    /// Get the file path for a session
    fn session_path(&self, session_key: &str) -> PathBuf {
        self.sessions_dir.join(format!("{}.json", Self::file_stem(session_key)))
    }

    async fn read_checkpoint(&self, path: &Path) -> Result<Option<Checkpoint>, StoreError> {
        match fs::read_to_string(path).await {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write through a temp file so a crash never leaves half a checkpoint
    async fn write_checkpoint(&self, path: &Path, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(checkpoint)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl MessageStore for FileStore {
    async fn append(&self, session_key: &str, message: Message) -> Result<(), StoreError> {
        self.append_many(session_key, vec![message]).await
    }

    async fn append_many(&self, session_key: &str, messages: Vec<Message>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.session_path(session_key);

        let mut checkpoint = self
            .read_checkpoint(&path)
            .await?
            .unwrap_or_else(|| Checkpoint::new(session_key));
        for message in messages {
            checkpoint.push(message);
        }

        self.write_checkpoint(&path, &checkpoint).await?;
        tracing::trace!(session = session_key, path = %path.display(), "checkpoint written");
        Ok(())
    }

    async fn load(&self, session_key: &str) -> Result<Vec<Message>, StoreError> {
        let path = self.session_path(session_key);
        Ok(self
            .read_checkpoint(&path)
            .await?
            .map(|c| c.messages)
            .unwrap_or_default())
    }

    async fn clear(&self, session_key: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(self.session_path(session_key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn sessions(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.sessions_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match self.read_checkpoint(&path).await {
                Ok(Some(checkpoint)) => keys.push(checkpoint.session_key),
                Ok(None) => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable checkpoint"),
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_file_stem_is_injective_for_lookalikes() {
        assert_eq!(FileStore::file_stem("static_session"), "static_5fsession");
        assert_eq!(FileStore::file_stem("a/b"), "a_2fb");
        assert_ne!(FileStore::file_stem("a/b"), FileStore::file_stem("a_b"));
        assert_eq!(FileStore::file_stem("../etc"), "_2e_2e_2fetc");
    }

    #[test]
    fn test_long_keys_use_fixed_length_digest() {
        let key = "세션".repeat(20);
        let stem = FileStore::file_stem(&key);
        assert!(stem.starts_with("sha256."));
        assert_eq!(stem.len(), "sha256.".len() + 64);
        assert_ne!(stem, FileStore::file_stem(&"세션".repeat(21)));

        // At the limit the readable form is kept
        let ascii = "a".repeat(MAX_STEM_LEN);
        assert_eq!(FileStore::file_stem(&ascii), ascii);
    }

    #[tokio::test]
    async fn test_long_non_ascii_key_round_trips() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path()).unwrap();
        let key = "세션".repeat(40);

        store.append(&key, Message::human("긴 세션")).await.unwrap();
        assert_eq!(store.load(&key).await.unwrap(), vec![Message::human("긴 세션")]);
        assert_eq!(store.sessions().await.unwrap(), vec![key.clone()]);

        assert!(store.clear(&key).await.unwrap());
        assert!(store.sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_through_disk() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path()).unwrap();

        store.append("static_session", Message::human("배운 것")).await.unwrap();
        store
            .append("static_session", Message::assistant("## 날짜: 2025-03-01"))
            .await
            .unwrap();

        // A fresh store over the same directory sees the same log
        let reopened = FileStore::new(tmp.path()).unwrap();
        let messages = reopened.load("static_session").await.unwrap();
        assert_eq!(
            messages,
            vec![Message::human("배운 것"), Message::assistant("## 날짜: 2025-03-01")]
        );
        assert_eq!(reopened.sessions().await.unwrap(), vec!["static_session"]);
    }

    #[tokio::test]
    async fn test_unknown_session_and_clear() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("nested")).unwrap();

        assert!(store.load("missing").await.unwrap().is_empty());
        assert!(!store.clear("missing").await.unwrap());

        store.append("k", Message::human("x")).await.unwrap();
        assert!(store.clear("k").await.unwrap());
        assert!(store.load("k").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_checkpoint_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("broken.json"), "{ not json").unwrap();

        let err = store.load("broken").await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
        // Listing skips it rather than failing
        assert!(store.sessions().await.unwrap().is_empty());
    }
}
