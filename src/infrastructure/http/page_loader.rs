//! Download of the page whose images get inlined.

use std::borrow::Cow;
use std::sync::LazyLock;

use async_trait::async_trait;
use encoding_rs::Encoding;
use regex::Regex;
use reqwest::{Client, StatusCode, header};
use tracing::{debug, info};
use url::Url;

use crate::domain::cancel::CancelSignal;
use crate::domain::errors::InlineError;
use crate::domain::ports::PageSource;

const HTML_MEDIA_TYPE: &str = "text/html";
/// Charset HTTP assumes when none is declared.
const DEFAULT_HTTP_CHARSET: &str = "ISO-8859-1";

static CONTENT_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([^;\s/]+/[^;\s/]+)\s*(?:;(.*))?$").expect("Invalid regex")
});

static CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|;)\s*charset\s*=\s*(?:"([^"\s]+)"|([^";\s]+))"#).expect("Invalid regex")
});

/// Parsed `Content-Type` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    /// Lowercase `type/subtype`.
    pub essence: String,
    /// Declared charset, if any.
    pub charset: Option<String>,
}

impl MediaType {
    /// Parses a `Content-Type` value. Returns `None` if it has no `type/subtype`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let captures = CONTENT_TYPE_RE.captures(value)?;
        let essence = captures.get(1)?.as_str().to_ascii_lowercase();
        let charset = captures
            .get(2)
            .and_then(|params| CHARSET_RE.captures(params.as_str()))
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| m.as_str().to_string());

        Some(Self { essence, charset })
    }

    /// Returns whether this is an HTML document type.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.essence == HTML_MEDIA_TYPE
    }
}

/// Loads HTML pages and hands back their text transcoded to UTF-8.
#[derive(Debug, Clone)]
pub struct PageLoader {
    client: Client,
    max_page_bytes: Option<usize>,
}

impl PageLoader {
    /// Creates loader on top of the shared client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self {
            client,
            max_page_bytes: None,
        }
    }

    /// Limits the accepted page size. `None` disables the limit.
    #[must_use]
    pub const fn with_max_page_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_page_bytes = limit;
        self
    }

    async fn receive_body(
        &self,
        response: &mut reqwest::Response,
        page_url: &Url,
        cancel: &CancelSignal,
    ) -> Result<Vec<u8>, InlineError> {
        let mut body = Vec::new();

        loop {
            let chunk = cancel
                .run(response.chunk())
                .await
                .ok_or_else(|| InlineError::cancelled("receiving page"))?
                .map_err(|source| InlineError::BodyTransfer {
                    url: page_url.to_string(),
                    source,
                })?;
            let Some(chunk) = chunk else {
                return Ok(body);
            };

            if let Some(limit) = self.max_page_bytes
                && body.len() + chunk.len() > limit
            {
                return Err(InlineError::PageTooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }
    }
}

#[async_trait]
impl PageSource for PageLoader {
    /// Downloads `page_url` and returns its body.
    ///
    /// Fails with a client error if the page does not answer 200, is not HTML,
    /// is too large, or cannot be decoded from its charset. Transport failures
    /// and cancellation are internal errors.
    async fn load(&self, page_url: &Url, cancel: &CancelSignal) -> Result<String, InlineError> {
        let mut response = cancel
            .run(self.client.get(page_url.clone()).send())
            .await
            .ok_or_else(|| InlineError::cancelled("requesting page"))?
            .map_err(|source| InlineError::Transport {
                url: page_url.to_string(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(InlineError::PageStatus {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let media_type = MediaType::parse(&content_type)
            .filter(MediaType::is_html)
            .ok_or_else(|| InlineError::NotHtml {
                content_type: content_type.clone(),
            })?;
        debug!(
            content_type = %media_type.essence,
            charset = ?media_type.charset,
            "Page content type accepted"
        );

        let body = self.receive_body(&mut response, page_url, cancel).await?;
        let text = decode_body(body, media_type.charset.as_deref())?;
        info!(url = %page_url, bytes = text.len(), "Page loaded");
        Ok(text)
    }
}

/// Transcodes `body` from its declared charset to UTF-8.
///
/// Undeclared bodies are kept as they are when already valid UTF-8, and are
/// otherwise read as ISO-8859-1.
fn decode_body(body: Vec<u8>, charset: Option<&str>) -> Result<String, InlineError> {
    match charset {
        Some(label) => decode_as(&body, label),
        None => String::from_utf8(body)
            .or_else(|e| decode_as(e.as_bytes(), DEFAULT_HTTP_CHARSET)),
    }
}

fn decode_as(body: &[u8], label: &str) -> Result<String, InlineError> {
    let encoding =
        Encoding::for_label(label.as_bytes()).ok_or_else(|| InlineError::UnsupportedCharset {
            charset: label.to_string(),
        })?;

    let text = encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(Cow::into_owned)
        .ok_or_else(|| InlineError::InvalidEncoding {
            charset: encoding.name().to_string(),
        })?;

    if encoding != encoding_rs::UTF_8 {
        debug!(charset = encoding.name(), "Page transcoded to UTF-8");
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use test_case::test_case;

    use crate::infrastructure::http::test_server::stalling_server;

    #[test_case("text/html", "text/html", None ; "bare")]
    #[test_case("text/html; charset=utf-8", "text/html", Some("utf-8") ; "charset")]
    #[test_case("Text/HTML;charset=\"UTF-8\"", "text/html", Some("UTF-8") ; "quoted_charset")]
    #[test_case("text/html; foo=bar; charset=koi8-r", "text/html", Some("koi8-r") ; "extra_params")]
    #[test_case("  image/png  ", "image/png", None ; "whitespace")]
    fn test_parse_media_type(value: &str, essence: &str, charset: Option<&str>) {
        let media_type = MediaType::parse(value).unwrap();

        assert_eq!(media_type.essence, essence);
        assert_eq!(media_type.charset.as_deref(), charset);
    }

    #[test_case("" ; "empty")]
    #[test_case("html" ; "no_subtype")]
    #[test_case("text/html/extra" ; "two_slashes")]
    fn test_parse_media_type_rejects(value: &str) {
        assert!(MediaType::parse(value).is_none());
    }

    struct Served {
        _server: mockito::ServerGuard,
        _mock: mockito::Mock,
        url: Url,
    }

    async fn serve(content_type: Option<&str>, body: Vec<u8>) -> Served {
        let mut server = mockito::Server::new_async().await;
        let mut mock = server.mock("GET", "/doc/page").with_status(200).with_body(body);
        if let Some(content_type) = content_type {
            mock = mock.with_header("content-type", content_type);
        }
        let mock = mock.create_async().await;

        let url = Url::parse(&format!("{}/doc/page", server.url())).unwrap();
        Served {
            _server: server,
            _mock: mock,
            url,
        }
    }

    #[tokio::test]
    async fn test_loads_utf8_html() {
        let body = "<p>héllo <img src=\"a.png\"></p>";
        let served = serve(Some("text/html; charset=utf-8"), body.into()).await;

        let text = PageLoader::new(Client::new())
            .load(&served.url, &CancelSignal::new())
            .await
            .unwrap();

        assert_eq!(text, body);
    }

    #[tokio::test]
    async fn test_undeclared_charset_with_valid_utf8_is_accepted() {
        let served = serve(Some("text/html"), b"<img src=a.png>".to_vec()).await;

        let text = PageLoader::new(Client::new())
            .load(&served.url, &CancelSignal::new())
            .await
            .unwrap();

        assert_eq!(text, "<img src=a.png>");
    }

    #[tokio::test]
    async fn test_non_html_is_client_error() {
        let served = serve(Some("application/json"), b"{}".to_vec()).await;

        let error = PageLoader::new(Client::new())
            .load(&served.url, &CancelSignal::new())
            .await
            .unwrap_err();

        assert!(matches!(error, InlineError::NotHtml { .. }));
        assert!(error.is_client_error());
    }

    #[tokio::test]
    async fn test_missing_content_type_is_not_html() {
        let served = serve(None, b"<p></p>".to_vec()).await;

        let error = PageLoader::new(Client::new())
            .load(&served.url, &CancelSignal::new())
            .await
            .unwrap_err();

        assert!(matches!(error, InlineError::NotHtml { .. }));
    }

    #[tokio::test]
    async fn test_declared_charset_is_transcoded() {
        // "Привет" in windows-1251.
        let mut body = b"<p>".to_vec();
        body.extend_from_slice(&[0xcf, 0xf0, 0xe8, 0xe2, 0xe5, 0xf2]);
        body.extend_from_slice(b"</p><img src=\"a.png\">");
        let served = serve(Some("text/html; charset=windows-1251"), body).await;

        let text = PageLoader::new(Client::new())
            .load(&served.url, &CancelSignal::new())
            .await
            .unwrap();

        assert_eq!(text, "<p>Привет</p><img src=\"a.png\">");
    }

    #[tokio::test]
    async fn test_charset_label_is_case_insensitive() {
        let served = serve(Some("text/html; charset=KOI8-R"), vec![0xf0, 0xd2, 0xc9]).await;

        let text = PageLoader::new(Client::new())
            .load(&served.url, &CancelSignal::new())
            .await
            .unwrap();

        assert_eq!(text, "При");
    }

    #[tokio::test]
    async fn test_undeclared_non_utf8_is_read_as_latin1() {
        let served = serve(Some("text/html"), b"<p>caf\xe9</p>".to_vec()).await;

        let text = PageLoader::new(Client::new())
            .load(&served.url, &CancelSignal::new())
            .await
            .unwrap();

        assert_eq!(text, "<p>café</p>");
    }

    #[tokio::test]
    async fn test_unknown_charset_is_rejected() {
        let served = serve(Some("text/html; charset=x-no-such-charset"), b"<p></p>".to_vec()).await;

        let error = PageLoader::new(Client::new())
            .load(&served.url, &CancelSignal::new())
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            InlineError::UnsupportedCharset { ref charset } if charset == "x-no-such-charset"
        ));
        assert!(error.is_client_error());
    }

    #[tokio::test]
    async fn test_page_over_limit_is_rejected() {
        let served = serve(Some("text/html"), vec![b'a'; 4096]).await;

        let error = PageLoader::new(Client::new())
            .with_max_page_bytes(Some(1024))
            .load(&served.url, &CancelSignal::new())
            .await
            .unwrap_err();

        assert!(matches!(error, InlineError::PageTooLarge { limit: 1024 }));
        assert!(error.is_client_error());
    }

    #[tokio::test]
    async fn test_page_within_limit_is_loaded() {
        let served = serve(Some("text/html"), vec![b'a'; 1024]).await;

        let text = PageLoader::new(Client::new())
            .with_max_page_bytes(Some(1024))
            .load(&served.url, &CancelSignal::new())
            .await
            .unwrap();

        assert_eq!(text.len(), 1024);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_body_download() {
        let base = stalling_server(
            b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 4096\r\n\r\n<p>",
        )
        .await;
        let url = Url::parse(&format!("{base}/doc/page")).unwrap();
        let cancel = CancelSignal::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let error = tokio::time::timeout(
            Duration::from_secs(5),
            PageLoader::new(Client::new()).load(&url, &cancel),
        )
        .await
        .expect("load should stop once cancelled")
        .unwrap_err();

        assert!(matches!(error, InlineError::Cancelled { ref stage } if stage == "receiving page"));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_declared_utf8_with_bad_bytes_is_rejected() {
        let served = serve(Some("text/html; charset=utf-8"), vec![0xff, 0xfe]).await;

        let error = PageLoader::new(Client::new())
            .load(&served.url, &CancelSignal::new())
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            InlineError::InvalidEncoding { ref charset } if charset == "UTF-8"
        ));
        assert!(error.is_client_error());
    }

    #[tokio::test]
    async fn test_page_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("GET", "/gone").with_status(410).create_async().await;
        let url = Url::parse(&format!("{}/gone", server.url())).unwrap();

        let error = PageLoader::new(Client::new())
            .load(&url, &CancelSignal::new())
            .await
            .unwrap_err();

        assert!(matches!(error, InlineError::PageStatus { status: 410 }));
    }
}
