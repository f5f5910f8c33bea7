//! Inbound event stream: one JSON object per line.
//!
//! ```text
//! {"type":"module_selected","id":"webrtc"}
//! {"type":"click","id":"c1","x":10,"y":20}
//! {"type":"swipe","id":"s1","x0":0,"y0":0,"x1":100,"y1":100,"duration_ms":250}
//! {"type":"request_stop","id":"webrtc"}
//! {"type":"supervision","active":false}
//! {"type":"input_surface","connected":false}
//! ```
//!
//! Malformed lines are logged and skipped; the stream ends at EOF.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use mirrorcast_core::error::CastError;
use mirrorcast_core::module::ModuleId;
use mirrorcast_core::relay::GestureCommand;

/// One event received from the remote side or the local UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    ModuleSelected {
        id: ModuleId,
    },
    Click {
        id: String,
        x: f64,
        y: f64,
    },
    Swipe {
        id: String,
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        duration_ms: i64,
    },
    RequestStop {
        id: ModuleId,
    },
    /// Pause (`false`) or resume (`true`) selection supervision.
    Supervision {
        active: bool,
    },
    /// The input-injection surface came up or went away.
    InputSurface {
        connected: bool,
    },
}

impl InboundEvent {
    pub fn parse(line: &str) -> Result<Self, CastError> {
        Ok(serde_json::from_str(line)?)
    }

    /// The gesture command carried by a click or swipe event.
    pub fn gesture(&self) -> Option<GestureCommand> {
        match self {
            Self::Click { id, x, y } => Some(GestureCommand::click(id.clone(), *x, *y)),
            Self::Swipe {
                id,
                x0,
                y0,
                x1,
                y1,
                duration_ms,
            } => Some(GestureCommand::swipe(
                id.clone(),
                (*x0, *y0),
                (*x1, *y1),
                *duration_ms,
            )),
            _ => None,
        }
    }
}

/// Read events from `reader` until EOF and forward them to `tx`.
///
/// Returns early if the receiving side goes away.
pub async fn pump<R>(reader: R, tx: mpsc::Sender<InboundEvent>) -> Result<(), CastError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match InboundEvent::parse(line) {
            Ok(event) => {
                debug!(line = line_no, ?event, "inbound");
                tx.send(event).await?;
            }
            Err(e) => warn!(line = line_no, "malformed inbound event: {e}"),
        }
    }

    debug!("inbound stream closed");
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────
