//! Storage handles and cross-handle change notification.
//!
//! A [`Storage`] is one "tab": an independent view onto a shared data
//! directory.  Handles opened on the same directory within one process
//! share a watcher registry, so a write through one handle synchronously
//! invokes the change callbacks of every *other* handle.  The writing
//! handle is never notified of its own writes.
//!
//! Writes are last-write-wins whole-file replaces.  There are no
//! transactions and no merge logic; readers re-fetch entire collections
//! when notified.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use directories::ProjectDirs;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, StoreError};

/// Named record collections held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Chats,
    Messages,
    Stories,
    BlockedUsers,
    /// Single-record session pointer, not a sequence.
    CurrentUser,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Users,
        Collection::Chats,
        Collection::Messages,
        Collection::Stories,
        Collection::BlockedUsers,
        Collection::CurrentUser,
    ];

    /// Storage key, identical to the keys the original web client used.
    pub fn key(self) -> &'static str {
        match self {
            Collection::Users => "zapchat_users",
            Collection::Chats => "zapchat_chats",
            Collection::Messages => "zapchat_messages",
            Collection::Stories => "zapchat_stories",
            Collection::BlockedUsers => "zapchat_blocked_users",
            Collection::CurrentUser => "zapchat_current_user",
        }
    }

    fn file_name(self) -> String {
        format!("{}.json", self.key())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

type WatchCallback = Arc<dyn Fn(Collection) + Send + Sync>;

struct WatcherEntry {
    id: u64,
    handle_id: u64,
    callback: WatchCallback,
}

/// State shared by every handle open on one directory.
#[derive(Default)]
struct DirShared {
    watchers: Mutex<Vec<WatcherEntry>>,
    next_watcher_id: AtomicU64,
}

/// Registry of open directories, keyed by canonical path.  Entries are
/// weak so a directory disappears from the registry once every handle on
/// it is dropped.
static OPEN_DIRS: Lazy<Mutex<HashMap<PathBuf, Weak<DirShared>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// One view onto a shared store directory.
pub struct Storage {
    dir: PathBuf,
    handle_id: u64,
    shared: Arc<DirShared>,
}

impl Storage {
    /// Open (or create) the default application store.
    ///
    /// The data directory is platform-appropriate:
    /// - Linux:   `~/.local/share/zapchat/`
    /// - macOS:   `~/Library/Application Support/com.zapchat.zapchat/`
    /// - Windows: `{FOLDERID_RoamingAppData}\zapchat\zapchat\data\`
    pub fn new() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("com", "zapchat", "zapchat").ok_or(StoreError::NoDataDir)?;
        Self::open_at(project_dirs.data_dir())
    }

    /// Open (or create) a store at an explicit directory.
    ///
    /// Useful for tests and for embedding the store inside custom layouts.
    /// Opening the same directory twice yields two independent handles
    /// ("tabs") that notify each other on writes.
    pub fn open_at(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let dir = dir.canonicalize()?;

        let shared = {
            let mut dirs = OPEN_DIRS.lock().unwrap_or_else(|e| e.into_inner());
            match dirs.get(&dir).and_then(Weak::upgrade) {
                Some(shared) => shared,
                None => {
                    let shared = Arc::new(DirShared::default());
                    dirs.insert(dir.clone(), Arc::downgrade(&shared));
                    shared
                }
            }
        };

        let handle_id = NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed);
        tracing::info!(dir = %dir.display(), handle = handle_id, "opening storage");

        Ok(Self {
            dir,
            handle_id,
            shared,
        })
    }

    /// The directory backing this handle.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether the collection has ever been written.
    pub fn contains(&self, collection: Collection) -> bool {
        self.dir.join(collection.file_name()).exists()
    }

    // ------------------------------------------------------------------
    // Whole-collection reads and writes
    // ------------------------------------------------------------------

    /// Read a full collection.  A collection that was never written reads
    /// as empty.
    pub fn get<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        match fs::read_to_string(self.dir.join(collection.file_name())) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace a full collection, then notify the other handles on this
    /// directory.
    pub fn put<T: Serialize>(&self, collection: Collection, items: &[T]) -> Result<()> {
        let text = serde_json::to_string(items)?;
        fs::write(self.dir.join(collection.file_name()), text)?;
        self.notify(collection);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Single-record collections (the session pointer)
    // ------------------------------------------------------------------

    /// Read a single-record collection; absent reads as `None`.
    pub fn get_record<T: DeserializeOwned>(&self, collection: Collection) -> Result<Option<T>> {
        match fs::read_to_string(self.dir.join(collection.file_name())) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace a single-record collection, then notify the other handles.
    pub fn put_record<T: Serialize>(&self, collection: Collection, record: &T) -> Result<()> {
        let text = serde_json::to_string(record)?;
        fs::write(self.dir.join(collection.file_name()), text)?;
        self.notify(collection);
        Ok(())
    }

    /// Remove a single-record collection.  Removing an absent record is a
    /// no-op and notifies nobody.
    pub fn delete_record(&self, collection: Collection) -> Result<()> {
        match fs::remove_file(self.dir.join(collection.file_name())) {
            Ok(()) => {
                self.notify(collection);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    // ------------------------------------------------------------------
    // Change notification
    // ------------------------------------------------------------------

    /// Register a change callback for writes made through *other* handles
    /// on this directory.  The registration lives until the returned guard
    /// is dropped.
    pub fn watch<F>(&self, callback: F) -> WatchGuard
    where
        F: Fn(Collection) + Send + Sync + 'static,
    {
        let id = self.shared.next_watcher_id.fetch_add(1, Ordering::Relaxed);
        let mut watchers = self.shared.watchers.lock().unwrap_or_else(|e| e.into_inner());
        watchers.push(WatcherEntry {
            id,
            handle_id: self.handle_id,
            callback: Arc::new(callback),
        });
        WatchGuard {
            shared: Arc::clone(&self.shared),
            id,
        }
    }

    fn notify(&self, collection: Collection) {
        // Snapshot first so callbacks run without holding the registry
        // lock and may read or watch re-entrantly.
        let callbacks: Vec<WatchCallback> = {
            let watchers = self.shared.watchers.lock().unwrap_or_else(|e| e.into_inner());
            watchers
                .iter()
                .filter(|w| w.handle_id != self.handle_id)
                .map(|w| Arc::clone(&w.callback))
                .collect()
        };
        for callback in callbacks {
            callback(collection);
        }
    }
}

/// Removes its watcher registration when dropped.
pub struct WatchGuard {
    shared: Arc<DirShared>,
    id: u64,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        let mut watchers = self.shared.watchers.lock().unwrap_or_else(|e| e.into_inner());
        watchers.retain(|w| w.id != self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn put_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open_at(dir.path()).unwrap();

        storage
            .put(Collection::BlockedUsers, &["u9".to_string()])
            .unwrap();
        let blocked: Vec<String> = storage.get(Collection::BlockedUsers).unwrap();
        assert_eq!(blocked, vec!["u9".to_string()]);
    }

    #[test]
    fn missing_collection_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open_at(dir.path()).unwrap();

        let users: Vec<String> = storage.get(Collection::Users).unwrap();
        assert!(users.is_empty());
        assert!(!storage.contains(Collection::Users));
    }

    #[test]
    fn record_round_trip_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open_at(dir.path()).unwrap();

        assert_eq!(
            storage.get_record::<String>(Collection::CurrentUser).unwrap(),
            None
        );

        storage
            .put_record(Collection::CurrentUser, &"u1".to_string())
            .unwrap();
        assert_eq!(
            storage.get_record::<String>(Collection::CurrentUser).unwrap(),
            Some("u1".to_string())
        );

        storage.delete_record(Collection::CurrentUser).unwrap();
        assert_eq!(
            storage.get_record::<String>(Collection::CurrentUser).unwrap(),
            None
        );
        // deleting again is a silent no-op
        storage.delete_record(Collection::CurrentUser).unwrap();
    }

    #[test]
    fn writes_notify_other_handles_but_not_the_writer() {
        let dir = tempfile::tempdir().unwrap();
        let a = Storage::open_at(dir.path()).unwrap();
        let b = Storage::open_at(dir.path()).unwrap();

        let seen_by_a = Arc::new(Mutex::new(Vec::new()));
        let seen_by_b = Arc::new(Mutex::new(Vec::new()));

        let a_log = Arc::clone(&seen_by_a);
        let _ga = a.watch(move |c| a_log.lock().unwrap().push(c));
        let b_log = Arc::clone(&seen_by_b);
        let _gb = b.watch(move |c| b_log.lock().unwrap().push(c));

        a.put(Collection::Messages, &["hi".to_string()]).unwrap();

        assert!(seen_by_a.lock().unwrap().is_empty());
        assert_eq!(*seen_by_b.lock().unwrap(), vec![Collection::Messages]);

        // and b's write reaches only a
        b.put(Collection::Chats, &["c1".to_string()]).unwrap();
        assert_eq!(*seen_by_a.lock().unwrap(), vec![Collection::Chats]);
        assert_eq!(*seen_by_b.lock().unwrap(), vec![Collection::Messages]);
    }

    #[test]
    fn dropped_guard_stops_notifications() {
        let dir = tempfile::tempdir().unwrap();
        let a = Storage::open_at(dir.path()).unwrap();
        let b = Storage::open_at(dir.path()).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let guard = b.watch(move |c| log.lock().unwrap().push(c));

        a.put(Collection::Stories, &["s1".to_string()]).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);

        drop(guard);
        a.put(Collection::Stories, &["s2".to_string()]).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn separate_directories_are_isolated() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let a = Storage::open_at(dir_a.path()).unwrap();
        let b = Storage::open_at(dir_b.path()).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let _g = b.watch(move |c| log.lock().unwrap().push(c));

        a.put(Collection::Messages, &["hi".to_string()]).unwrap();
        assert!(seen.lock().unwrap().is_empty());

        let messages: Vec<String> = b.get(Collection::Messages).unwrap();
        assert!(messages.is_empty());
    }
}
