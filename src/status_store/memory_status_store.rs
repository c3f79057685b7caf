use super::JobStatusStore;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Process-local status store. Records vanish on restart, so jobs stored here
/// cannot be resumed after the process dies.
#[derive(Default)]
pub struct InMemoryJobStatusStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl InMemoryJobStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStatusStore for InMemoryJobStatusStore {
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .unwrap_or_else(|| Instant::now() + Duration::from_secs(365 * 24 * 60 * 60));
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(value, _)| value.clone()))
    }

    fn purge_expired(&self) -> Result<usize> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        Ok(before - entries.len())
    }
}
