//! Thread module - conversation memory
//!
//! Per-thread append-only message history, keyed by a caller-supplied thread
//! identifier. Append is the only mutation; a read always observes a prefix
//! of what any concurrent append will produce.
//!
//! # Example
//!
//! ```
//! use savora::thread::{ThreadStore, Message};
//!
//! # tokio_test::block_on(async {
//! let store = ThreadStore::new_memory();
//!
//! store.append("web:visitor-42", Message::user("Hello!")).await.unwrap();
//! store.append("web:visitor-42", Message::agent("Hi there!")).await.unwrap();
//!
//! let history = store.read("web:visitor-42").await.unwrap();
//! assert_eq!(history.len(), 2);
//! # });
//! ```

pub mod types;

pub use types::{Message, Role, Thread, ToolInvocation};

use crate::error::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Store for conversation threads.
///
/// Keeps an in-memory map of threads with optional JSON file persistence.
/// Appends to the same thread id are serialized through a per-key lock so two
/// in-flight requests can never interleave a partially written message;
/// appends to distinct threads proceed concurrently.
///
/// Cloning is cheap and shares the underlying state.
pub struct ThreadStore {
    /// In-memory cache of threads
    threads: Arc<RwLock<HashMap<String, Thread>>>,
    /// Per-thread locks serializing appends for the same id
    append_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
    /// Optional directory for file-based persistence
    storage_path: Option<PathBuf>,
}

impl ThreadStore {
    /// Create a store with file-based persistence under the given directory.
    ///
    /// The directory is created if it doesn't exist.
    pub fn with_path(path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&path)?;
        Ok(Self {
            threads: Arc::new(RwLock::new(HashMap::new())),
            append_locks: Arc::new(Mutex::new(HashMap::new())),
            storage_path: Some(path),
        })
    }

    /// Create an in-memory store without persistence.
    ///
    /// Useful for tests and ephemeral deployments.
    pub fn new_memory() -> Self {
        Self {
            threads: Arc::new(RwLock::new(HashMap::new())),
            append_locks: Arc::new(Mutex::new(HashMap::new())),
            storage_path: None,
        }
    }

    /// Read a thread's history. Returns an empty history for unseen ids.
    ///
    /// The returned vector is a snapshot: a consistent prefix of the thread's
    /// history at the time of the call.
    pub async fn read(&self, thread_id: &str) -> Result<Vec<Message>> {
        if let Some(thread) = self.load(thread_id).await? {
            return Ok(thread.history);
        }
        Ok(Vec::new())
    }

    /// Append one message to a thread, creating the thread lazily.
    ///
    /// Appends for the same thread id are serialized; the in-memory history
    /// is extended atomically under the map's write lock, so readers never
    /// observe a partially appended message.
    pub async fn append(&self, thread_id: &str, message: Message) -> Result<()> {
        let key_lock = self.key_lock(thread_id).await;
        let result = {
            let _guard = key_lock.lock().await;
            self.append_locked(thread_id, message).await
        };
        drop(key_lock);
        self.release_key_lock(thread_id).await;
        result
    }

    async fn append_locked(&self, thread_id: &str, message: Message) -> Result<()> {
        // Pull the thread into the cache (or create it) before mutating.
        let _ = self.load(thread_id).await?;

        let snapshot = {
            let mut threads = self.threads.write().await;
            let thread = threads
                .entry(thread_id.to_string())
                .or_insert_with(|| Thread::new(thread_id));
            thread.append(message);
            thread.clone()
        };

        debug!(thread = %thread_id, len = snapshot.len(), "Appended message");
        self.persist(&snapshot).await
    }

    /// Check if a thread exists in memory or on disk.
    pub async fn exists(&self, thread_id: &str) -> bool {
        {
            let threads = self.threads.read().await;
            if threads.contains_key(thread_id) {
                return true;
            }
        }
        if let Some(ref storage_path) = self.storage_path {
            return storage_path
                .join(format!("{}.json", Self::sanitize_id(thread_id)))
                .exists();
        }
        false
    }

    /// List all known thread ids, sorted.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();

        {
            let threads = self.threads.read().await;
            ids.extend(threads.keys().cloned());
        }

        // Read each file to recover the original (unsanitized) id.
        if let Some(ref storage_path) = self.storage_path {
            let mut dir_entries = tokio::fs::read_dir(storage_path).await?;
            while let Some(entry) = dir_entries.next_entry().await? {
                let path = entry.path();
                if path.extension().map(|e| e == "json").unwrap_or(false) {
                    if let Ok(content) = tokio::fs::read_to_string(&path).await {
                        if let Ok(thread) = serde_json::from_str::<Thread>(&content) {
                            if !ids.contains(&thread.id) {
                                ids.push(thread.id);
                            }
                        }
                    }
                }
            }
        }

        ids.sort();
        Ok(ids)
    }

    /// Number of threads currently cached in memory.
    pub async fn cache_size(&self) -> usize {
        let threads = self.threads.read().await;
        threads.len()
    }

    /// Load a thread into the cache, reading from disk on a cache miss.
    async fn load(&self, thread_id: &str) -> Result<Option<Thread>> {
        {
            let threads = self.threads.read().await;
            if let Some(thread) = threads.get(thread_id) {
                return Ok(Some(thread.clone()));
            }
        }

        if let Some(ref storage_path) = self.storage_path {
            let file_path = storage_path.join(format!("{}.json", Self::sanitize_id(thread_id)));
            if file_path.exists() {
                let content = tokio::fs::read_to_string(&file_path).await?;
                let thread: Thread = serde_json::from_str(&content)?;

                let mut threads = self.threads.write().await;
                threads.insert(thread_id.to_string(), thread.clone());
                return Ok(Some(thread));
            }
        }

        Ok(None)
    }

    /// Write a thread snapshot to disk if persistence is enabled.
    async fn persist(&self, thread: &Thread) -> Result<()> {
        if let Some(ref storage_path) = self.storage_path {
            let file_path = storage_path.join(format!("{}.json", Self::sanitize_id(&thread.id)));
            let content = serde_json::to_string_pretty(thread)?;
            tokio::fs::write(&file_path, content).await?;
        }
        Ok(())
    }

    /// Get or create the append lock for a thread id.
    async fn key_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.append_locks.lock().await;
        locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop a per-key lock entry once no appender holds it.
    ///
    /// Keeps the lock map bounded by in-flight appends rather than by every
    /// thread id the process has ever seen. An entry with outstanding clones
    /// stays put, so a waiting appender never loses its lock.
    async fn release_key_lock(&self, thread_id: &str) {
        let mut locks = self.append_locks.lock().await;
        if let Some(entry) = locks.get(thread_id) {
            if Arc::strong_count(entry) == 1 {
                locks.remove(thread_id);
            }
        }
    }

    /// Sanitize a thread id for use as a filename.
    ///
    /// Percent-encodes filesystem-hostile characters so the mapping is
    /// bijective: distinct ids never collide on the same file.
    fn sanitize_id(id: &str) -> String {
        let mut result = String::with_capacity(id.len() * 3);
        for c in id.chars() {
            match c {
                '/' => result.push_str("%2F"),
                '\\' => result.push_str("%5C"),
                ':' => result.push_str("%3A"),
                '*' => result.push_str("%2A"),
                '?' => result.push_str("%3F"),
                '"' => result.push_str("%22"),
                '<' => result.push_str("%3C"),
                '>' => result.push_str("%3E"),
                '|' => result.push_str("%7C"),
                '%' => result.push_str("%25"),
                c => result.push(c),
            }
        }
        result
    }
}

impl Clone for ThreadStore {
    fn clone(&self) -> Self {
        Self {
            threads: Arc::clone(&self.threads),
            append_locks: Arc::clone(&self.append_locks),
            storage_path: self.storage_path.clone(),
        }
    }
}

impl Default for ThreadStore {
    /// Creates an in-memory store. Use `with_path` for persistence.
    fn default() -> Self {
        Self::new_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_unseen_thread_is_empty() {
        let store = ThreadStore::new_memory();
        let history = store.read("never-seen").await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_append_and_read() {
        let store = ThreadStore::new_memory();
        store.append("t1", Message::user("Hello")).await.unwrap();
        store.append("t1", Message::agent("Hi!")).await.unwrap();

        let history = store.read("t1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "Hello");
        assert_eq!(history[1].role, Role::Agent);
    }

    #[tokio::test]
    async fn test_append_atomicity() {
        // Two sequential reads separated by one append differ by exactly one
        // whole message.
        let store = ThreadStore::new_memory();
        store.append("t1", Message::user("first")).await.unwrap();

        let before = store.read("t1").await.unwrap();
        store.append("t1", Message::agent("second")).await.unwrap();
        let after = store.read("t1").await.unwrap();

        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(&after[..before.len()], &before[..]);
        assert_eq!(after.last().unwrap().content, "second");
    }

    #[tokio::test]
    async fn test_exists() {
        let store = ThreadStore::new_memory();
        assert!(!store.exists("t1").await);
        store.append("t1", Message::user("x")).await.unwrap();
        assert!(store.exists("t1").await);
    }

    #[tokio::test]
    async fn test_list() {
        let store = ThreadStore::new_memory();
        store.append("beta", Message::user("x")).await.unwrap();
        store.append("alpha", Message::user("y")).await.unwrap();

        let ids = store.list().await.unwrap();
        assert_eq!(ids, vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[tokio::test]
    async fn test_store_clone_shares_state() {
        let store1 = ThreadStore::new_memory();
        let store2 = store1.clone();

        store1.append("shared", Message::user("Test")).await.unwrap();

        let history = store2.read("shared").await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_file_persistence() {
        let temp_dir = TempDir::new().unwrap();
        let storage_path = temp_dir.path().to_path_buf();

        {
            let store = ThreadStore::with_path(storage_path.clone()).unwrap();
            store
                .append("persist-test", Message::user("Persisted message"))
                .await
                .unwrap();
        }

        // Fresh store instance reads the same thread from disk
        {
            let store = ThreadStore::with_path(storage_path).unwrap();
            let history = store.read("persist-test").await.unwrap();
            assert_eq!(history.len(), 1);
            assert_eq!(history[0].content, "Persisted message");
        }
    }

    #[tokio::test]
    async fn test_list_returns_original_ids_with_special_chars() {
        let temp_dir = TempDir::new().unwrap();
        let store = ThreadStore::with_path(temp_dir.path().to_path_buf()).unwrap();

        let ids = ["web:visitor-1", "app/device/2"];
        for id in &ids {
            store.append(id, Message::user("x")).await.unwrap();
        }

        let fresh = ThreadStore::with_path(temp_dir.path().to_path_buf()).unwrap();
        let listed = fresh.list().await.unwrap();
        for id in &ids {
            assert!(
                listed.contains(&id.to_string()),
                "list() should contain original id '{}', got {:?}",
                id,
                listed
            );
        }
    }

    #[tokio::test]
    async fn test_concurrent_appends_same_thread() {
        let store = Arc::new(ThreadStore::new_memory());
        let mut handles = Vec::new();

        for i in 0..10 {
            let store_clone = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store_clone
                    .append("concurrent", Message::user(&format!("Message {}", i)))
                    .await
                    .unwrap();
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        // Per-key serialization: no append is lost
        let history = store.read("concurrent").await.unwrap();
        assert_eq!(history.len(), 10);
    }

    #[tokio::test]
    async fn test_concurrent_appends_distinct_threads() {
        let store = Arc::new(ThreadStore::new_memory());
        let mut handles = Vec::new();

        for i in 0..8 {
            let store_clone = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let id = format!("thread-{}", i);
                store_clone.append(&id, Message::user("x")).await.unwrap();
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.cache_size().await, 8);
    }

    #[tokio::test]
    async fn test_append_locks_released_when_idle() {
        let store = ThreadStore::new_memory();
        for i in 0..5 {
            let id = format!("thread-{}", i);
            store.append(&id, Message::user("x")).await.unwrap();
        }
        // Nothing in flight, so the lock map holds no entries
        assert!(store.append_locks.lock().await.is_empty());
        // Released locks don't affect stored history
        assert_eq!(store.read("thread-0").await.unwrap().len(), 1);
    }

    #[test]
    fn test_sanitize_id() {
        assert_eq!(ThreadStore::sanitize_id("simple"), "simple");
        assert_eq!(
            ThreadStore::sanitize_id("web:visitor-1"),
            "web%3Avisitor-1"
        );
        assert_eq!(ThreadStore::sanitize_id("a/b"), "a%2Fb");
        // Percent itself is escaped so the encoding stays bijective
        assert_eq!(ThreadStore::sanitize_id("100%done"), "100%25done");
        assert_ne!(
            ThreadStore::sanitize_id("a:b"),
            ThreadStore::sanitize_id("a/b")
        );
    }
}
