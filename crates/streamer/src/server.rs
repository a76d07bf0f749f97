//! HTTP dispatcher wiring requests to a stream provider

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio_util::io::ReaderStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::provider::{SegmentContent, StreamProvider, FALLBACK_CONTENT_TYPE};
use crate::Error;

/// Content type of the manifest response
pub const MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// Origin host used when the request carries no `Host` header
const FALLBACK_HOST: &str = "localhost";

#[derive(Clone)]
struct AppState {
    provider: Arc<dyn StreamProvider>,
}

/// HTTP streaming dispatcher: serves the playlist manifest at a configured
/// path and treats every other path as a segment request
pub struct StreamServer {
    path: String,
    provider: Arc<dyn StreamProvider>,
}

impl StreamServer {
    /// Dispatcher serving the manifest at the default path `/`
    pub fn new(provider: Arc<dyn StreamProvider>) -> Self {
        Self {
            path: "/".to_string(),
            provider,
        }
    }

    /// Serve the manifest at `path` instead of `/`. Must start with `/`.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Create the axum router: the manifest route at the configured path and
    /// a fallback route resolving segments. Unrelated request handling
    /// composes at the `Router` level (merge or nest this router into a
    /// larger app).
    pub fn router(&self) -> Router {
        let state = AppState {
            provider: self.provider.clone(),
        };

        Router::new()
            .route(&self.path, get(manifest))
            .fallback(get(segment))
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and serve until the process exits
    pub async fn serve(self, host: &str, port: u16) -> crate::Result<()> {
        let addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        tracing::info!("stream server listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}

/// Wire mapping for provider errors: not-ready maps to 404, everything
/// else to 500. Error responses carry no body.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::debug!("request failed: {}", self);

        let status = match self {
            Error::NotReady => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        status.into_response()
    }
}

fn ensure_exists(provider: &dyn StreamProvider) -> Result<(), Error> {
    if provider.exists()? {
        Ok(())
    } else {
        Err(Error::NotReady)
    }
}

async fn manifest(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, Error> {
    ensure_exists(state.provider.as_ref())?;

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(FALLBACK_HOST);
    let playlist = state.provider.manifest(host)?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, MANIFEST_CONTENT_TYPE)],
        playlist,
    )
        .into_response())
}

async fn segment(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, Error> {
    ensure_exists(state.provider.as_ref())?;

    let range_header = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());
    let content = state.provider.segment(uri.path(), range_header).await?;

    Ok(segment_response(content))
}

/// Build the 200/206 segment response. The body streams chunk by chunk so
/// back-pressure propagates and a client disconnect drops the source stream.
fn segment_response(content: SegmentContent) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(FALLBACK_CONTENT_TYPE)),
    );

    let body = Body::from_stream(ReaderStream::new(content.stream));

    match content.range {
        None => {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(content.length));
            (StatusCode::OK, headers, body).into_response()
        }
        Some(range) => {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(range.byte_len()));
            let content_range = format!("bytes {}-{}/{}", range.start, range.end, content.length);
            if let Ok(value) = HeaderValue::from_str(&content_range) {
                headers.insert(header::CONTENT_RANGE, value);
            }
            (StatusCode::PARTIAL_CONTENT, headers, body).into_response()
        }
    }
}
