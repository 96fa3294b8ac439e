use std::sync::Mutex;

use anyhow::{Result, anyhow};

use super::Storage;

/// Volatile slot for tests, `--memory`, and `--demo` runs. Contents vanish
/// with the process.
#[derive(Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<String>>,
}

impl Storage for MemoryStorage {
    fn read(&self) -> Result<Option<String>> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| anyhow!("memory slot mutex poisoned"))?;
        Ok(slot.clone())
    }

    fn write(&self, payload: &str) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow!("memory slot mutex poisoned"))?;
        *slot = Some(payload.to_string());
        Ok(())
    }
}
