//! Port for scanning HTML into image tags.

use std::io::Read;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::domain::cancel::CancelSignal;
use crate::domain::entities::ImageTag;
use crate::domain::errors::InlineError;

/// One item of a scan: an image, or the error that ended the scan.
pub type ScanItem = Result<ImageTag, InlineError>;

/// Lazy, single-pass sequence of scanned images.
///
/// The producer sends at most one error and it is always the last item
/// before the sequence ends, so reaching the end without an error means the
/// scan succeeded.
#[derive(Debug)]
pub struct ImageStream {
    receiver: mpsc::Receiver<ScanItem>,
    producer: Option<JoinHandle<()>>,
}

impl ImageStream {
    /// Wraps the receiving side of a scan and the task producing it.
    #[must_use]
    pub const fn new(receiver: mpsc::Receiver<ScanItem>, producer: JoinHandle<()>) -> Self {
        Self {
            receiver,
            producer: Some(producer),
        }
    }

    /// Waits for the next scanned item. `None` marks the end of the scan.
    pub async fn next(&mut self) -> Option<ScanItem> {
        self.receiver.recv().await
    }

    /// Stops receiving and waits for the producer to exit.
    pub async fn close(mut self) {
        self.receiver.close();
        if let Some(producer) = self.producer.take()
            && let Err(e) = producer.await
        {
            warn!(error = %e, "Scan producer terminated abnormally");
        }
    }
}

/// Port for HTML image scanners.
pub trait ImageScanner: Send + Sync {
    /// Starts scanning `input` in the background and returns the image stream.
    ///
    /// Must be called from within a Tokio runtime.
    fn scan(&self, input: Box<dyn Read + Send>, cancel: CancelSignal) -> ImageStream;
}
