//! Duplicate suppression for inbound host requests.

use std::collections::HashSet;

use tracing::warn;

/// Request identifiers already handled by one host instance.
///
/// Grows for the lifetime of the instance; it is only cleared when the
/// instance is dropped. Request volume is a handful per session.
#[derive(Debug, Default)]
pub struct ProcessedCommandSet {
    seen: HashSet<String>,
}

impl ProcessedCommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when `id` was already seen by this instance.
    ///
    /// An untagged request (`None`) is never a duplicate. A new id is
    /// recorded and reported as not duplicate.
    pub fn is_duplicate(&mut self, id: Option<&str>) -> bool {
        match id {
            None => {
                warn!("request carries no id; processing it");
                false
            }
            Some(id) if self.seen.contains(id) => {
                warn!(request_id = id, "duplicate request id");
                true
            }
            Some(id) => {
                self.seen.insert(id.to_string());
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
