//! Observable "currently selected module" value.
//!
//! Backed by a `watch` cell: the producer overwrites the last value and
//! wakes observers; each observer filters consecutive duplicates itself.

use tokio::sync::watch;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;

use crate::module::descriptor::ModuleId;

/// Lazy, infinite sequence of selected module ids with
/// distinct-until-changed semantics.
///
/// A fresh stream starts with the current selection (if any), so
/// re-observing after a pause yields the latest value, never history.
pub struct SelectionStream {
    inner: WatchStream<Option<ModuleId>>,
    last: Option<ModuleId>,
}

impl SelectionStream {
    pub(crate) fn new(rx: watch::Receiver<Option<ModuleId>>) -> Self {
        Self {
            inner: WatchStream::new(rx),
            last: None,
        }
    }

    /// Next selection that differs from the previous one.
    ///
    /// Returns `None` only when the registry has been dropped.
    /// Cancel-safe.
    pub async fn next(&mut self) -> Option<ModuleId> {
        while let Some(value) = self.inner.next().await {
            let Some(id) = value else {
                continue;
            };
            if self.last.as_ref() == Some(&id) {
                continue;
            }
            self.last = Some(id.clone());
            return Some(id);
        }
        None
    }
}
