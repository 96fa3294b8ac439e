use std::collections::HashSet;
use std::sync::{Arc, mpsc};

use anyhow::{Context, Result, anyhow};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::domain::task::{Task, TaskId};

pub mod file;
pub mod memory;

/// One key-value slot holding the whole serialized task list. Reading an
/// absent slot yields `None`; writing overwrites the slot wholesale.
pub trait Storage: Send + Sync {
    fn read(&self) -> Result<Option<String>>;
    fn write(&self, payload: &str) -> Result<()>;
}

/// Completion handle for a single write-behind save. The UI drops it and
/// moves on; tests wait on it to pin down when the slot was written.
pub struct SaveTicket {
    rx: mpsc::Receiver<Result<()>>,
}

impl SaveTicket {
    /// Block until the write lands and report how it went.
    #[allow(dead_code)]
    pub fn wait(self) -> Result<()> {
        match self.rx.recv() {
            Ok(result) => result,
            Err(_) => Err(anyhow!("persistence worker went away before reporting")),
        }
    }
}

/// Authoritative in-memory task list with write-behind persistence.
///
/// Every mutation rewrites the entire list into the storage slot. The write
/// runs on a background worker so callers never wait on I/O; the in-memory
/// list stays the source of truth for the session even when a write fails.
pub struct TaskStore {
    storage: Arc<dyn Storage>,
    tasks: Vec<Task>,
    rt: tokio::runtime::Runtime,
}

impl TaskStore {
    pub fn new(storage: Arc<dyn Storage>) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start the persistence runtime")?;
        Ok(Self {
            storage,
            tasks: Vec::new(),
            rt,
        })
    }

    /// Store pre-filled with `seed`, for demo runs. Seeds live in memory
    /// only; nothing is written until the first real mutation.
    pub fn with_seed(
        storage: Arc<dyn Storage>,
        seed: impl IntoIterator<Item = Task>,
    ) -> Result<Self> {
        let mut store = Self::new(storage)?;
        store.tasks.extend(seed);
        Ok(store)
    }

    /// Replace the list with whatever the slot holds. Called once at
    /// startup. A missing slot, an unreadable payload, or a read error all
    /// leave the list empty; failures are logged, never surfaced.
    pub fn load(&mut self) {
        let raw = match self.storage.read() {
            Ok(raw) => raw,
            Err(e) => {
                warn!("failed to read the task slot: {e:#}");
                None
            }
        };
        let mut tasks: Vec<Task> = match raw {
            Some(payload) => match serde_json::from_str(&payload) {
                Ok(tasks) => tasks,
                Err(e) => {
                    warn!("stored task list is unreadable, starting empty: {e}");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        // Defend the list invariants against hand-edited slots: text must
        // stay non-blank and ids unique, first occurrence wins.
        let before = tasks.len();
        let mut seen = HashSet::new();
        tasks.retain(|t| !t.text.trim().is_empty() && seen.insert(t.id.clone()));
        if tasks.len() < before {
            warn!("dropped {} invalid stored tasks", before - tasks.len());
        }

        debug!("loaded {} tasks", tasks.len());
        self.tasks = tasks;
    }

    /// Current collection snapshot, insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Append a task with a fresh id. `text` is trimmed first; when nothing
    /// remains the call is a no-op and no save is issued.
    pub fn add(&mut self, text: &str, due: Option<OffsetDateTime>) -> Option<SaveTicket> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let task = match due {
            Some(due) => Task::with_due(text, due),
            None => Task::new(text),
        };
        self.tasks.push(task);
        Some(self.persist())
    }

    /// Drop the task with `id` if present. The slot is rewritten either
    /// way; an unknown id is not an error.
    pub fn remove(&mut self, id: TaskId) -> SaveTicket {
        self.tasks.retain(|t| t.id != id);
        self.persist()
    }

    /// Flip `completed` on the task with `id`, in either direction. The
    /// slot is rewritten either way; an unknown id is not an error.
    pub fn toggle_complete(&mut self, id: TaskId) -> SaveTicket {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.completed = !task.completed;
        }
        self.persist()
    }

    /// Serialize the whole list and hand the write to the background
    /// worker. Serialization happens on the calling thread so the payload
    /// reflects the mutation the caller just made; overlapping writes race
    /// and the last one to finish wins. One attempt per save, no retry, no
    /// rollback of the in-memory list.
    fn persist(&self) -> SaveTicket {
        let (tx, rx) = mpsc::channel();
        match serde_json::to_string_pretty(&self.tasks) {
            Ok(payload) => {
                let storage = Arc::clone(&self.storage);
                let _ = self.rt.spawn_blocking(move || {
                    let result = storage.write(&payload);
                    if let Err(e) = &result {
                        warn!("failed to persist tasks: {e:#}");
                    }
                    let _ = tx.send(result);
                });
            }
            Err(e) => {
                warn!("failed to serialize tasks: {e}");
                let _ = tx.send(Err(e.into()));
            }
        }
        SaveTicket { rx }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStorage;
    use super::*;
    use time::macros::datetime;

    struct FailingStorage;

    impl Storage for FailingStorage {
        fn read(&self) -> Result<Option<String>> {
            Ok(None)
        }

        fn write(&self, _payload: &str) -> Result<()> {
            Err(anyhow!("slot unavailable"))
        }
    }

    fn memory_store() -> (Arc<MemoryStorage>, TaskStore) {
        let storage = Arc::new(MemoryStorage::default());
        let store = TaskStore::new(storage.clone()).unwrap();
        (storage, store)
    }

    #[test]
    fn blank_text_is_rejected_without_a_save() {
        let (storage, mut store) = memory_store();
        assert!(store.add("", None).is_none());
        assert!(store.add("   ", None).is_none());
        assert!(store.tasks().is_empty());
        assert!(storage.read().unwrap().is_none());
    }

    #[test]
    fn adds_append_in_call_order() {
        let (_, mut store) = memory_store();
        for text in ["first", "second", "third"] {
            store.add(text, None).unwrap().wait().unwrap();
        }
        let texts: Vec<_> = store.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["first", "second", "third"]);
    }

    #[test]
    fn text_is_trimmed_before_storage() {
        let (_, mut store) = memory_store();
        store.add("  buy milk  ", None).unwrap().wait().unwrap();
        assert_eq!(store.tasks()[0].text, "buy milk");
    }

    #[test]
    fn removing_an_unknown_id_changes_nothing_but_still_saves() {
        let (storage, mut store) = memory_store();
        store.add("keep me", None).unwrap().wait().unwrap();
        let before = store.tasks().to_vec();

        store.remove(TaskId::generate()).wait().unwrap();

        assert_eq!(store.tasks(), before);
        let payload = storage.read().unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
    }

    #[test]
    fn removing_the_middle_task_keeps_the_rest_in_order() {
        let (_, mut store) = memory_store();
        store.add("a", None).unwrap().wait().unwrap();
        store.add("b", None).unwrap().wait().unwrap();
        store.add("c", None).unwrap().wait().unwrap();
        let ids: Vec<_> = store.tasks().iter().map(|t| t.id.clone()).collect();

        store.remove(ids[1].clone()).wait().unwrap();

        let rest: Vec<_> = store.tasks().iter().map(|t| t.id.clone()).collect();
        assert_eq!(rest, [ids[0].clone(), ids[2].clone()]);
    }

    #[test]
    fn toggling_twice_restores_the_flag() {
        let (_, mut store) = memory_store();
        store.add("flip me", None).unwrap().wait().unwrap();
        let id = store.tasks()[0].id.clone();

        store.toggle_complete(id.clone()).wait().unwrap();
        assert!(store.tasks()[0].completed);

        store.toggle_complete(id).wait().unwrap();
        assert!(!store.tasks()[0].completed);
    }

    #[test]
    fn toggling_an_unknown_id_is_a_noop() {
        let (_, mut store) = memory_store();
        store.add("untouched", None).unwrap().wait().unwrap();

        store.toggle_complete(TaskId::generate()).wait().unwrap();

        assert!(!store.tasks()[0].completed);
    }

    #[test]
    fn saved_list_reloads_exactly() {
        let (storage, mut store) = memory_store();
        store.add("no due date", None).unwrap().wait().unwrap();
        store
            .add("with due date", Some(datetime!(2024-12-25 0:00 UTC)))
            .unwrap()
            .wait()
            .unwrap();
        let id = store.tasks()[0].id.clone();
        store.toggle_complete(id).wait().unwrap();
        let expected = store.tasks().to_vec();

        let mut reloaded = TaskStore::new(storage).unwrap();
        reloaded.load();

        assert_eq!(reloaded.tasks(), expected);
    }

    #[test]
    fn slot_payload_matches_the_storage_contract() {
        let (storage, mut store) = memory_store();
        store
            .add("Call mom", Some(datetime!(2024-12-25 0:00 UTC)))
            .unwrap()
            .wait()
            .unwrap();
        store.add("Buy milk", None).unwrap().wait().unwrap();

        let payload = storage.read().unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        let tasks = value.as_array().unwrap();

        assert_eq!(tasks[0]["text"], "Call mom");
        assert_eq!(tasks[0]["completed"], false);
        assert_eq!(tasks[0]["date"], "2024-12-25T00:00:00Z");
        assert!(!tasks[0]["id"].as_str().unwrap().is_empty());
        assert!(tasks[1].get("date").is_none());
    }

    #[test]
    fn loading_an_absent_slot_starts_empty() {
        let (_, mut store) = memory_store();
        store.load();
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn loading_a_malformed_slot_starts_empty() {
        let (storage, mut store) = memory_store();
        storage.write("{ not json }").unwrap();
        store.load();
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn loading_accepts_the_legacy_title_key() {
        let (storage, mut store) = memory_store();
        storage
            .write(r#"[{"id":"1632476400000","title":"old payload","completed":false}]"#)
            .unwrap();
        store.load();
        assert_eq!(store.tasks()[0].text, "old payload");
    }

    #[test]
    fn loading_keeps_decimal_ids_from_older_slots() {
        let (storage, mut store) = memory_store();
        storage
            .write(r#"[{"id":"1695238472000","text":"Comprar leche","completed":false,"date":"2023-09-28T12:34:56.789Z"}]"#)
            .unwrap();
        store.load();

        assert_eq!(store.tasks().len(), 1);
        let id = store.tasks()[0].id.clone();
        assert_eq!(id.to_string(), "1695238472000");
        assert_eq!(store.tasks()[0].text, "Comprar leche");
        assert_eq!(
            store.tasks()[0].due,
            Some(datetime!(2023-09-28 12:34:56.789 UTC))
        );

        store.toggle_complete(id).wait().unwrap();
        let payload = storage.read().unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value[0]["id"], "1695238472000");
        assert_eq!(value[0]["completed"], true);
    }

    #[test]
    fn loading_drops_blank_and_duplicate_entries() {
        let (storage, mut store) = memory_store();
        storage
            .write(
                r#"[
                    {"id":"2b1c6f4a-59cb-4c11-9b7f-5be01c2fd001","text":"kept","completed":false},
                    {"id":"2b1c6f4a-59cb-4c11-9b7f-5be01c2fd001","text":"duplicate id","completed":false},
                    {"id":"9e0d23aa-8a4f-4a5e-8f77-1a2b3c4d5e6f","text":"   ","completed":false}
                ]"#,
            )
            .unwrap();
        store.load();
        let texts: Vec<_> = store.tasks().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["kept"]);
    }

    #[test]
    fn a_failed_save_leaves_memory_authoritative() {
        let mut store = TaskStore::new(Arc::new(FailingStorage)).unwrap();
        let ticket = store.add("still here", None).unwrap();
        assert!(ticket.wait().is_err());
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].text, "still here");
    }

    #[test]
    fn seeded_store_starts_full_without_touching_the_slot() {
        let storage = Arc::new(MemoryStorage::default());
        let store =
            TaskStore::with_seed(storage.clone(), vec![Task::new("a"), Task::new("b")]).unwrap();
        assert_eq!(store.tasks().len(), 2);
        assert!(storage.read().unwrap().is_none());
    }
}
