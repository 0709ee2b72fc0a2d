//! Handler trait for the stage behind the middleware.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::body::SigilResponseBody;
use crate::context::AuthContext;

/// Future returned by [`AuthenticatedHandler::handle`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = http::Response<SigilResponseBody>> + Send>>;

/// Trait implemented by the application behind [`AuthService`](crate::AuthService).
///
/// The handler receives the request with its fully buffered body and the
/// [`AuthContext`] for it. Errors are the handler's to map into responses.
pub trait AuthenticatedHandler: Send + Sync + 'static {
    /// Handle one request.
    fn handle(&self, ctx: AuthContext, req: http::Request<Bytes>) -> HandlerFuture;
}
