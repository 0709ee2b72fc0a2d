//! Front service: answers health probes, sends everything else through
//! authentication.
//!
//! Health checks (`/health`, `/_sigil/health`) bypass authentication so that
//! load balancers can probe a server that rejects anonymous requests.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use hyper::body::Incoming;
use hyper::service::Service;

use sigil_auth::CredentialProvider;
use sigil_http::response::json_response;
use sigil_http::{AuthService, AuthenticatedHandler, SigilResponseBody};

/// Server version reported in health check responses.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Routes health probes locally and everything else to an [`AuthService`].
#[derive(Debug)]
pub struct GatewayService<P, H> {
    auth: AuthService<P, H>,
}

impl<P, H> GatewayService<P, H> {
    /// Create a gateway in front of `auth`.
    pub fn new(auth: AuthService<P, H>) -> Self {
        Self { auth }
    }
}

impl<P, H> Clone for GatewayService<P, H> {
    fn clone(&self) -> Self {
        Self {
            auth: self.auth.clone(),
        }
    }
}

impl<P, H> Service<http::Request<Incoming>> for GatewayService<P, H>
where
    P: CredentialProvider + 'static,
    H: AuthenticatedHandler,
{
    type Response = http::Response<SigilResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        if is_health_check(req.method(), req.uri().path()) {
            return Box::pin(async { Ok(health_check_response()) });
        }
        self.auth.call(req)
    }
}

/// Check if the request is a health check probe.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && (path == "/health" || path == "/_sigil/health")
}

fn health_check_response() -> http::Response<SigilResponseBody> {
    let body = serde_json::json!({
        "status": "running",
        "version": VERSION,
    });
    json_response(http::StatusCode::OK, &body, "health")
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    #[test]
    fn test_should_detect_health_check_paths() {
        assert!(is_health_check(&http::Method::GET, "/health"));
        assert!(is_health_check(&http::Method::GET, "/_sigil/health"));
        assert!(!is_health_check(&http::Method::POST, "/health"));
        assert!(!is_health_check(&http::Method::GET, "/v1/items"));
    }

    #[tokio::test]
    async fn test_should_report_running_with_version() {
        let resp = health_check_response();
        assert_eq!(resp.status(), http::StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "application/json");
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["version"], VERSION);
    }
}
