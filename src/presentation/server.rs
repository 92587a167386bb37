//! HTTP front end: `GET /?url=<page>` answers with the page's inlined images.

use std::net::SocketAddr;

use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tracing::info;
use url::form_urlencoded;

use super::error_response::ErrorResponse;
use super::fragment::render_fragment;
use crate::application::RenderPageUseCase;
use crate::domain::cancel::CancelSignal;
use crate::domain::errors::InlineError;

const URL_PARAM: &str = "url";
const HTML_CONTENT_TYPE: &str = "text/html;charset=utf-8";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Builds the router. Only `/` is served; methods other than GET and HEAD
/// are answered with 405.
#[must_use]
pub fn router(use_case: RenderPageUseCase) -> Router {
    Router::new()
        .route("/", get(inline_page))
        .with_state(use_case)
}

/// Serves requests on `listener` until `shutdown` fires.
///
/// # Errors
/// Returns the I/O error that stopped the server.
pub async fn serve(
    listener: TcpListener,
    use_case: RenderPageUseCase,
    shutdown: CancelSignal,
) -> std::io::Result<()> {
    let addr: SocketAddr = listener.local_addr()?;
    info!(%addr, "Listening for inline requests");

    axum::serve(listener, router(use_case))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

/// Cancels the request's work when the handler future goes away, e.g. when
/// the client disconnects.
struct CancelOnDrop(CancelSignal);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

async fn inline_page(
    State(use_case): State<RenderPageUseCase>,
    RawQuery(query): RawQuery,
) -> Response {
    let cancel = CancelSignal::new();
    let _guard = CancelOnDrop(cancel.clone());

    let result = match extract_url_param(query.as_deref()) {
        Ok(page_url) => use_case.execute(&page_url, cancel).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(page) => {
            info!(url = %page.page_url, images = page.images.len(), "Page inlined");
            reply(StatusCode::OK, HTML_CONTENT_TYPE, render_fragment(&page.images))
        }
        Err(e) => {
            let response = ErrorResponse::from_error(&e);
            let status = StatusCode::from_u16(response.status)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            reply(status, JSON_CONTENT_TYPE, response.body)
        }
    }
}

fn reply(status: StatusCode, content_type: &'static str, body: String) -> Response {
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
        (header::CONTENT_LENGTH, HeaderValue::from(body.len())),
    ];
    (status, headers, body).into_response()
}

/// The query must carry `url` exactly once and nothing else.
fn extract_url_param(query: Option<&str>) -> Result<String, InlineError> {
    let mut urls = Vec::new();
    for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        if key != URL_PARAM {
            return Err(InlineError::InvalidQuery {
                reason: "unexpected non url params",
            });
        }
        urls.push(value.into_owned());
    }

    let mut urls = urls.into_iter();
    match (urls.next(), urls.next()) {
        (Some(url), None) => Ok(url),
        (None, _) => Err(InlineError::InvalidQuery {
            reason: "too few url params",
        }),
        (Some(_), Some(_)) => Err(InlineError::InvalidQuery {
            reason: "too many url params",
        }),
    }
}
