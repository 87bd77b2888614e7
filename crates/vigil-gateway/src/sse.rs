//! Server-sent event framing.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use vigil_core::StreamFrame;

/// Final chunk of every stream.
pub const DONE_CHUNK: &str = "data: [DONE]\n\n";

/// Encode one frame as `data: <json>\n\n`.
#[must_use]
pub fn encode_frame(frame: &StreamFrame) -> Option<Bytes> {
    match serde_json::to_string(frame) {
        Ok(json) => Some(Bytes::from(format!("data: {json}\n\n"))),
        Err(e) => {
            warn!(error = %e, "failed to serialize stream frame");
            None
        },
    }
}

/// Drain `rx` as SSE chunks, then send [`DONE_CHUNK`].
///
/// Dropping the stream before it ends cancels `cancel`.
pub(crate) fn frame_stream(
    mut rx: mpsc::UnboundedReceiver<StreamFrame>,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    async_stream::stream! {
        let guard = cancel.drop_guard();
        while let Some(frame) = rx.recv().await {
            if let Some(chunk) = encode_frame(&frame) {
                yield Ok::<Bytes, Infallible>(chunk);
            }
        }
        let _token = guard.disarm();
        yield Ok(Bytes::from_static(DONE_CHUNK.as_bytes()));
    }
}

/// Wrap a chunk stream in an event-stream response.
pub(crate) fn sse_response<S>(stream: S) -> Response
where
    S: Stream<Item = Result<Bytes, Infallible>> + Send + 'static,
{
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    (headers, Body::from_stream(stream)).into_response()
}
