use super::{RecordStore, Records, Result, StoreError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-process store used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Records>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Records) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Last content written by `save`.
    pub fn snapshot(&self) -> Records {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every following `save` fail, to exercise the tolerant write path.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn load(&self) -> Result<Records> {
        Ok(self.snapshot())
    }

    async fn save(&self, records: &Records) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "memory store is read-only",
            )));
        }
        let mut stored = self
            .records
            .lock()
            .map_err(|_| StoreError::Integrity("memory store lock poisoned".to_string()))?;
        *stored = records.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
