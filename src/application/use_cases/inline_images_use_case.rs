//! Image inlining pipeline: scan, resolve, fetch concurrently, aggregate.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::application::dto::InlineRequest;
use crate::application::services::url_resolver::{folder_url, resolve};
use crate::domain::cancel::CancelSignal;
use crate::domain::entities::{FetchTask, ImageTag};
use crate::domain::errors::InlineError;
use crate::domain::ports::{ImageFetcher, ImageScanner, ImageStream, ScanItem};

type FetchOutcome = Result<ImageTag, InlineError>;

/// Inlines every image of one HTML page.
///
/// Each scanned image that is not already inline gets its own fetch task.
/// The first error from the scan or any fetch cancels the remaining work,
/// waits for every started task to finish, and is returned alone; there is
/// no partial success. Results come back in completion order.
#[derive(Clone)]
pub struct InlineImagesUseCase {
    scanner: Arc<dyn ImageScanner>,
    fetcher: Arc<dyn ImageFetcher>,
    max_concurrent_fetches: Option<usize>,
}

impl InlineImagesUseCase {
    /// Creates use case with unbounded fetch concurrency.
    #[must_use]
    pub fn new(scanner: Arc<dyn ImageScanner>, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            scanner,
            fetcher,
            max_concurrent_fetches: None,
        }
    }

    /// Caps how many fetches perform network I/O at once. `None` or `Some(0)`
    /// removes the cap.
    #[must_use]
    pub fn with_max_concurrent_fetches(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent_fetches = limit.filter(|limit| *limit > 0);
        self
    }

    /// Runs the pipeline for one page.
    ///
    /// # Errors
    /// Returns the first scan, resolution, or fetch error, or
    /// [`InlineError::Cancelled`] if the caller's signal fires.
    pub async fn execute(&self, request: InlineRequest) -> Result<Vec<ImageTag>, InlineError> {
        let span = info_span!(
            "inline_images",
            page_url = %request.page_url,
            request_id = %Uuid::new_v4()
        );
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: InlineRequest) -> Result<Vec<ImageTag>, InlineError> {
        let InlineRequest {
            page_url,
            body,
            cancel: caller_cancel,
        } = request;

        let mut pipeline = Pipeline::new(
            Arc::clone(&self.fetcher),
            folder_url(&page_url),
            self.max_concurrent_fetches,
        );
        debug!(folder = %pipeline.folder, "Starting image scan");
        let mut scan = self.scanner.scan(body, pipeline.cancel.clone());

        let outcome = loop {
            if pipeline.is_done() {
                break Ok(());
            }

            let step = tokio::select! {
                item = scan.next(), if pipeline.scan_open => pipeline.on_scan(item),
                joined = pipeline.tasks.join_next(), if pipeline.outstanding > 0 => {
                    pipeline.on_completion(joined)
                }
                () = caller_cancel.cancelled() => {
                    Err(InlineError::cancelled("inlining page images"))
                }
            };

            if let Err(error) = step {
                break Err(error);
            }
        };

        match outcome {
            Ok(()) => {
                scan.close().await;
                info!(
                    scanned = pipeline.scanned,
                    fetched = pipeline.fetched,
                    images = pipeline.results.len(),
                    "Page images inlined"
                );
                Ok(pipeline.results)
            }
            Err(error) => {
                pipeline.abort(scan, &error).await;
                Err(error)
            }
        }
    }
}

/// State of one pipeline run.
struct Pipeline {
    fetcher: Arc<dyn ImageFetcher>,
    folder: String,
    cancel: CancelSignal,
    limiter: Option<Arc<Semaphore>>,
    tasks: JoinSet<FetchOutcome>,
    /// Dispatched fetches whose outcome has not been received yet.
    outstanding: usize,
    scan_open: bool,
    scanned: usize,
    fetched: usize,
    results: Vec<ImageTag>,
}

impl Pipeline {
    fn new(fetcher: Arc<dyn ImageFetcher>, folder: String, limit: Option<usize>) -> Self {
        Self {
            fetcher,
            folder,
            cancel: CancelSignal::new(),
            limiter: limit.map(|limit| Arc::new(Semaphore::new(limit))),
            tasks: JoinSet::new(),
            outstanding: 0,
            scan_open: true,
            scanned: 0,
            fetched: 0,
            results: Vec::new(),
        }
    }

    const fn is_done(&self) -> bool {
        !self.scan_open && self.outstanding == 0
    }

    fn on_scan(&mut self, item: Option<ScanItem>) -> Result<(), InlineError> {
        match item {
            None => {
                self.scan_open = false;
                debug!(scanned = self.scanned, "Image scan complete");
                Ok(())
            }
            Some(Err(error)) => {
                self.scan_open = false;
                Err(error)
            }
            Some(Ok(image)) => self.accept(image),
        }
    }

    fn accept(&mut self, image: ImageTag) -> Result<(), InlineError> {
        self.scanned += 1;

        if image.is_inline() {
            debug!("Image already inline, accepted as is");
            self.results.push(image);
            return Ok(());
        }

        let url = resolve(image.src(), &self.folder)?;
        self.dispatch(FetchTask::new(image, url));
        Ok(())
    }

    fn dispatch(&mut self, task: FetchTask) {
        self.outstanding += 1;
        debug!(url = %task.url(), outstanding = self.outstanding, "Dispatching image fetch");

        let worker = fetch_with_limit(
            Arc::clone(&self.fetcher),
            task,
            self.cancel.clone(),
            self.limiter.clone(),
        );
        self.tasks.spawn(worker.in_current_span());
    }

    fn on_completion(
        &mut self,
        joined: Option<Result<FetchOutcome, JoinError>>,
    ) -> Result<(), InlineError> {
        let outcome = match joined {
            Some(Ok(outcome)) => outcome,
            Some(Err(e)) => Err(InlineError::internal(format!("fetch worker failed: {e}"))),
            None => Err(InlineError::internal("fetch worker missing")),
        };
        self.outstanding = self.outstanding.saturating_sub(1);

        let image = outcome?;
        self.fetched += 1;
        debug!(outstanding = self.outstanding, "Image fetch completed");
        self.results.push(image);
        Ok(())
    }

    /// Cancels outstanding work and waits until none of it is running.
    async fn abort(mut self, scan: ImageStream, error: &InlineError) {
        warn!(error = %error, outstanding = self.outstanding, "Aborting image inlining");
        self.cancel.cancel();

        while self.outstanding > 0 {
            if self.tasks.join_next().await.is_none() {
                break;
            }
            self.outstanding -= 1;
        }

        scan.close().await;
    }
}

async fn fetch_with_limit(
    fetcher: Arc<dyn ImageFetcher>,
    task: FetchTask,
    cancel: CancelSignal,
    limiter: Option<Arc<Semaphore>>,
) -> FetchOutcome {
    let _permit = match limiter {
        Some(limiter) => Some(
            cancel
                .run(limiter.acquire_owned())
                .await
                .ok_or_else(|| InlineError::cancelled(format!("waiting to fetch {}", task.url())))?
                .map_err(|e| InlineError::internal(format!("fetch limiter closed: {e}")))?,
        ),
        None => None,
    };

    fetcher.fetch(task, cancel).await
}
