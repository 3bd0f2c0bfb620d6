//! Delivery seam between the connection and whatever consumes frames.

use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Receives every data frame read from the upstream connection.
///
/// Called on the connection task, one frame at a time and in arrival order.
/// Implementations must not block: a slow sink stalls ingestion.
pub trait FrameSink: Send + Sync + 'static {
    fn on_frame(&self, frame: &[u8]);
}

/// Forward frames into a bounded channel, dropping them when it is full.
impl FrameSink for mpsc::Sender<Vec<u8>> {
    fn on_frame(&self, frame: &[u8]) {
        match self.try_send(frame.to_vec()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(len = frame.len(), "Frame channel full, dropping frame");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Frame receiver dropped");
            }
        }
    }
}
