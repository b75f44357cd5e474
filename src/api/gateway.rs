//! Request cancellation gateway
//!
//! Wraps every inbound request so that in-flight work stops the instant the
//! client disconnects. The handler stack runs as its own tokio task —
//! independent of the connection — and observes a per-request
//! [`CancellationToken`] at every suspension point through
//! `run_until_cancelled`. The gateway future itself is what hyper drops when
//! the transport closes; a [`DropGuard`](tokio_util::sync::DropGuard) turns
//! that drop into exactly one cancellation signal. On normal completion the
//! guard is disarmed first, so no signal is ever issued for a finished
//! request.

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio_util::sync::CancellationToken;

/// Per-request cancellation handle, inserted into request extensions by
/// [`cancel_on_disconnect`].
///
/// The default value is a fresh token that never fires: a handler reached
/// without the gateway layer simply runs uncancellable.
#[derive(Clone, Debug, Default)]
pub struct RequestCancellation(pub CancellationToken);

/// Nonstandard "client closed request" status (nginx's 499).
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Synthetic response for a request whose client went away.
///
/// It never reaches the wire — the transport is already closed — but the
/// handler task still needs something to resolve with.
pub(crate) fn client_closed_response() -> Response {
    StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        .into_response()
}

/// Middleware wrapping every request in a cancellable unit of work.
pub async fn cancel_on_disconnect(mut request: Request, next: Next) -> Response {
    let cancel = CancellationToken::new();
    request
        .extensions_mut()
        .insert(RequestCancellation(cancel.clone()));

    // Spawned rather than awaited inline: the handler must not die silently
    // with the connection — cancellation is explicit, observable, and logged.
    let handler = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match cancel.run_until_cancelled(next.run(request)).await {
                Some(response) => response,
                None => {
                    tracing::info!("cancelling handler task, client disconnected");
                    client_closed_response()
                }
            }
        }
    });

    // Hyper drops this future the moment the client disconnects; the guard
    // then issues the one cancellation signal into the handler task.
    let guard = cancel.drop_guard();

    match handler.await {
        Ok(response) => {
            // Normal completion: disarm before dropping, no signal issued
            let _ = guard.disarm();
            response
        }
        Err(join_error) => {
            let _ = guard.disarm();
            tracing::error!(error = %join_error, "request handler task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
