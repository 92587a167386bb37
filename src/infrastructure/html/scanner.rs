//! Streaming `<img>` scanner built on `lol_html`.

use std::cell::{Cell, RefCell};
use std::io::{ErrorKind, Read};

use html_escape::decode_html_entities;
use lol_html::{HtmlRewriter, Settings, element};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::domain::cancel::CancelSignal;
use crate::domain::entities::ImageTag;
use crate::domain::errors::InlineError;
use crate::domain::ports::{ImageScanner, ImageStream, ScanItem};

/// Default number of bytes fed to the tokenizer at a time.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Why a scan ended before the end of input.
enum ScanStop {
    /// The scan failed and the consumer must hear about it.
    Failed(InlineError),
    /// The consumer went away or the scan was cancelled.
    Abandoned,
}

/// Scans HTML on a blocking worker and streams every `<img>` it meets.
///
/// Both `<img ...>` and `<img ... />` are recognized; other markup is skipped.
#[derive(Debug, Clone)]
pub struct HtmlImageScanner {
    chunk_size: usize,
}

impl HtmlImageScanner {
    /// Creates scanner with the default chunk size.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Creates scanner reading `chunk_size` bytes at a time.
    #[must_use]
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Default for HtmlImageScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageScanner for HtmlImageScanner {
    fn scan(&self, input: Box<dyn Read + Send>, cancel: CancelSignal) -> ImageStream {
        let (tx, rx) = mpsc::channel(1);
        let chunk_size = self.chunk_size;

        let producer = tokio::task::spawn_blocking(move || {
            match scan_blocking(input, chunk_size, &tx, &cancel) {
                Ok(scanned) => debug!(scanned, "Scan finished"),
                Err(ScanStop::Failed(e)) => {
                    debug!(error = %e, "Scan failed");
                    // The error goes out before `tx` drops, so it precedes the end signal.
                    let _ = tx.blocking_send(Err(e));
                }
                Err(ScanStop::Abandoned) => debug!("Scan abandoned"),
            }
        });

        ImageStream::new(rx, producer)
    }
}

fn scan_blocking(
    mut input: Box<dyn Read + Send>,
    chunk_size: usize,
    tx: &mpsc::Sender<ScanItem>,
    cancel: &CancelSignal,
) -> Result<usize, ScanStop> {
    let stop: RefCell<Option<ScanStop>> = RefCell::new(None);
    let scanned = Cell::new(0_usize);

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![element!("img", |el| {
                // Attribute values come back raw; entities are decoded here.
                let attributes = el.attributes().iter().map(|attr| {
                    let value = decode_html_entities(&attr.value()).into_owned();
                    (attr.name(), value)
                });

                let image = match ImageTag::from_attributes(attributes) {
                    Ok(image) => image,
                    Err(e) => {
                        stop.replace(Some(ScanStop::Failed(e)));
                        return Err("img element without src".into());
                    }
                };

                trace!(src = %image.src(), "Scanned img element");
                if tx.blocking_send(Ok(image)).is_err() {
                    stop.replace(Some(ScanStop::Abandoned));
                    return Err("image receiver closed".into());
                }
                scanned.set(scanned.get() + 1);
                Ok(())
            })],
            ..Settings::default()
        },
        |_: &[u8]| {},
    );

    let mut buf = vec![0_u8; chunk_size];
    loop {
        if cancel.is_cancelled() {
            return Err(ScanStop::Abandoned);
        }

        let read = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(source) => return Err(ScanStop::Failed(InlineError::ReadInput { source })),
        };

        if let Err(e) = rewriter.write(&buf[..read]) {
            return Err(stop
                .take()
                .unwrap_or_else(|| ScanStop::Failed(InlineError::scan(e.to_string()))));
        }
    }

    if let Err(e) = rewriter.end() {
        return Err(stop
            .take()
            .unwrap_or_else(|| ScanStop::Failed(InlineError::scan(e.to_string()))));
    }

    Ok(scanned.get())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use crate::domain::entities::AttributeName;

    async fn collect(scanner: &HtmlImageScanner, html: &str) -> Vec<ScanItem> {
        let input = Box::new(Cursor::new(html.as_bytes().to_vec()));
        let mut stream = scanner.scan(input, CancelSignal::new());

        let mut items = Vec::new();
        while let Some(item) = stream.next().await {
            items.push(item);
        }
        stream.close().await;
        items
    }

    #[tokio::test]
    async fn test_no_images_ends_cleanly() {
        let html = r#"<header id="top">
            <div>
              <h1><a href="/">Dominik Honnef</a></h1>
              <div class="feed"></div>
            </div>
          </header>"#;

        let items = collect(&HtmlImageScanner::new(), html).await;

        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_self_closing_img() {
        let items = collect(&HtmlImageScanner::new(), r#"<img src="/img/atom.png" />"#).await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap().src(), "/img/atom.png");
    }

    #[tokio::test]
    async fn test_nested_img_is_the_only_item() {
        let html = r#"<a href="/atom.xml"><img src="/img/atom.png" /></a>"#;

        let items = collect(&HtmlImageScanner::new(), html).await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap().src(), "/img/atom.png");
    }

    #[tokio::test]
    async fn test_open_form_keeps_supported_attributes_in_order() {
        let html = r#"<p><img    alt="aaaa" class="x" src="image.gif" width="3" ></p>"#;

        let items = collect(&HtmlImageScanner::new(), html).await;

        let image = items[0].as_ref().unwrap();
        let names: Vec<_> = image.attributes().iter().map(|a| a.name()).collect();
        assert_eq!(
            names,
            vec![AttributeName::Alt, AttributeName::Src, AttributeName::Width]
        );
        assert_eq!(image.src_index(), 1);
    }

    #[tokio::test]
    async fn test_missing_src_reports_client_error_then_ends() {
        let html = r#"<img alt="a"><img src="after.png">"#;

        let items = collect(&HtmlImageScanner::new(), html).await;

        assert_eq!(items.len(), 1);
        let error = items[0].as_ref().unwrap_err();
        assert!(matches!(error, InlineError::MissingSource));
        assert!(error.is_client_error());
    }

    #[tokio::test]
    async fn test_attribute_entities_are_decoded() {
        let html = r#"<img src="/thumb?w=10&amp;h=20" alt="Tom &amp; Jerry">"#;

        let items = collect(&HtmlImageScanner::new(), html).await;

        let image = items[0].as_ref().unwrap();
        assert_eq!(image.src(), "/thumb?w=10&h=20");
        assert_eq!(image.get(AttributeName::Alt), Some("Tom & Jerry"));
    }

    #[tokio::test]
    async fn test_tags_split_across_chunks() {
        let html = r#"<div><img src="a.png" alt="first"><span>x</span><img src="b.png"/></div>"#;

        let items = collect(&HtmlImageScanner::with_chunk_size(3), html).await;

        let sources: Vec<_> = items.iter().map(|i| i.as_ref().unwrap().src()).collect();
        assert_eq!(sources, vec!["a.png", "b.png"]);
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("connection reset"))
        }
    }

    #[tokio::test]
    async fn test_read_failure_is_reported() {
        let scanner = HtmlImageScanner::new();
        let mut stream = scanner.scan(Box::new(FailingReader), CancelSignal::new());

        let first = stream.next().await;
        assert!(matches!(first, Some(Err(InlineError::ReadInput { .. }))));
        assert!(stream.next().await.is_none());
        stream.close().await;
    }

    #[tokio::test]
    async fn test_cancelled_scan_yields_nothing() {
        let cancel = CancelSignal::new();
        cancel.cancel();
        let input = Box::new(Cursor::new(b"<img src=\"a.png\">".to_vec()));

        let mut stream = HtmlImageScanner::new().scan(input, cancel);

        assert!(stream.next().await.is_none());
        stream.close().await;
    }

    #[tokio::test]
    async fn test_close_stops_producer_blocked_on_send() {
        let html = "<img src=\"a.png\">".repeat(64);
        let input = Box::new(Cursor::new(html.into_bytes()));
        let mut stream = HtmlImageScanner::with_chunk_size(16).scan(input, CancelSignal::new());

        assert!(stream.next().await.is_some());
        tokio::time::timeout(std::time::Duration::from_secs(5), stream.close())
            .await
            .expect("producer should exit once the stream is closed");
    }
}
