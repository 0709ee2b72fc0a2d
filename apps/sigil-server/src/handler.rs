//! `whoami` handler: reports what the middleware decided about a request.

use bytes::Bytes;
use sigil_http::response::json_response;
use sigil_http::{AuthContext, AuthenticatedHandler, HandlerFuture};

/// Answers every request with the caller's authentication state.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhoAmIHandler;

impl AuthenticatedHandler for WhoAmIHandler {
    fn handle(&self, ctx: AuthContext, req: http::Request<Bytes>) -> HandlerFuture {
        Box::pin(async move {
            let json = serde_json::json!({
                "authenticated": ctx.is_authenticated(),
                "identity": ctx.identity().map(sigil_auth::Identity::as_str),
                "method": req.method().as_str(),
                "path": req.uri().path(),
                "requestId": ctx.request_id,
            });
            json_response(http::StatusCode::OK, &json, &ctx.request_id)
        })
    }
}
