//! Authentication middleware implementing the hyper `Service` trait.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tracing::{debug, error, warn};

use sigil_auth::{CredentialProvider, RejectReason, SignatureVerifier, VerificationResult};

use crate::body::SigilResponseBody;
use crate::config::AuthLayerConfig;
use crate::context::AuthContext;
use crate::handler::AuthenticatedHandler;
use crate::replay::ReplayGuard;
use crate::response::{REQUEST_ID_HEADER, error_response};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Hyper `Service` that authenticates requests before handing them on.
///
/// Generic over the request body, so it serves `hyper::body::Incoming` in
/// production and `Full<Bytes>` in tests alike.
pub struct AuthService<P, H> {
    verifier: Arc<SignatureVerifier<P>>,
    handler: Arc<H>,
    config: Arc<AuthLayerConfig>,
    replay: Option<Arc<ReplayGuard>>,
}

impl<P: CredentialProvider + 'static, H: AuthenticatedHandler> AuthService<P, H> {
    /// Create a new `AuthService`.
    pub fn new(verifier: SignatureVerifier<P>, handler: Arc<H>, config: AuthLayerConfig) -> Self {
        let replay = config.replay_protection.then(|| {
            Arc::new(ReplayGuard::for_clock_skew(
                verifier.config().max_clock_skew(),
            ))
        });
        Self {
            verifier: Arc::new(verifier),
            handler,
            config: Arc::new(config),
            replay,
        }
    }
}

impl<P, H> Clone for AuthService<P, H> {
    fn clone(&self) -> Self {
        Self {
            verifier: Arc::clone(&self.verifier),
            handler: Arc::clone(&self.handler),
            config: Arc::clone(&self.config),
            replay: self.replay.clone(),
        }
    }
}

impl<P, H> fmt::Debug for AuthService<P, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("config", &self.config)
            .field("replay", &self.replay)
            .finish_non_exhaustive()
    }
}

impl<P, H, B> hyper::service::Service<http::Request<B>> for AuthService<P, H>
where
    P: CredentialProvider + 'static,
    H: AuthenticatedHandler,
    B: http_body::Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = http::Response<SigilResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<B>) -> Self::Future {
        let service = self.clone();
        let request_id = uuid::Uuid::new_v4().to_string();

        Box::pin(async move {
            let response = service.process_request(req, &request_id).await;
            Ok(add_common_headers(response, &request_id))
        })
    }
}

impl<P: CredentialProvider + 'static, H: AuthenticatedHandler> AuthService<P, H> {
    /// Run one request through the pipeline.
    async fn process_request<B>(
        &self,
        req: http::Request<B>,
        request_id: &str,
    ) -> http::Response<SigilResponseBody>
    where
        B: http_body::Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();

        // 1. Collect body within the limit.
        let body = match collect_body(body, self.config.max_body_bytes).await {
            Ok(body) => body,
            Err(err) => return err.into_response(request_id),
        };

        // 2. Authenticate off the async workers; providers may block.
        let (parts, body, mut result) = match self.authenticate(parts, body).await {
            Ok(authenticated) => authenticated,
            Err(err) => {
                error!(request_id, error = %err, "authentication task failed");
                return error_response(
                    http::StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error",
                    None,
                    request_id,
                );
            }
        };

        // 3. Replay check, only for requests that would otherwise pass.
        if result.is_authenticated() {
            if let Some(guard) = &self.replay {
                if let Err(reason) = guard.check_request(&parts) {
                    result = VerificationResult::rejected(reason);
                }
            }
        }

        // 4. Reject or forward.
        if let Some(reason) = result.rejection() {
            log_rejection(reason, &parts, request_id);
            if self.config.reject_unauthenticated {
                let reason = result.reason();
                return error_response(
                    http::StatusCode::UNAUTHORIZED,
                    "unauthorized",
                    self.config.expose_reasons.then_some(reason.as_str()),
                    request_id,
                );
            }
        }

        let ctx = AuthContext::new(result, request_id);
        self.handler
            .handle(ctx, http::Request::from_parts(parts, body))
            .await
    }
}

impl<P: CredentialProvider + 'static, H> AuthService<P, H> {
    /// Verify on the blocking pool, handing the request back with the result.
    async fn authenticate(
        &self,
        parts: http::request::Parts,
        body: Bytes,
    ) -> Result<(http::request::Parts, Bytes, VerificationResult), tokio::task::JoinError> {
        let verifier = Arc::clone(&self.verifier);
        tokio::task::spawn_blocking(move || {
            let result = verifier.authenticate(&parts, &body);
            (parts, body, result)
        })
        .await
    }
}

/// Why a request body could not be buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyError {
    TooLarge,
    Unreadable,
}

impl BodyError {
    fn into_response(self, request_id: &str) -> http::Response<SigilResponseBody> {
        let (status, error) = match self {
            Self::TooLarge => (http::StatusCode::PAYLOAD_TOO_LARGE, "payload too large"),
            Self::Unreadable => (http::StatusCode::BAD_REQUEST, "unreadable request body"),
        };
        error_response(status, error, None, request_id)
    }
}

/// Buffer the body, refusing anything over `limit` bytes.
async fn collect_body<B>(body: B, limit: usize) -> Result<Bytes, BodyError>
where
    B: http_body::Body,
    B::Error: Into<BoxError>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.is::<LengthLimitError>() => {
            debug!(limit, "request body over limit");
            Err(BodyError::TooLarge)
        }
        Err(err) => {
            debug!(error = %err, "failed to read request body");
            Err(BodyError::Unreadable)
        }
    }
}

fn log_rejection(reason: &RejectReason, parts: &http::request::Parts, request_id: &str) {
    if matches!(reason, RejectReason::MissingAuthorization) {
        debug!(request_id, method = %parts.method, path = parts.uri.path(), "anonymous request");
    } else {
        warn!(
            request_id,
            method = %parts.method,
            path = parts.uri.path(),
            %reason,
            "request failed authentication"
        );
    }
}

/// Add headers every response carries.
fn add_common_headers(
    mut response: http::Response<SigilResponseBody>,
    request_id: &str,
) -> http::Response<SigilResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.entry(REQUEST_ID_HEADER).or_insert(hv);
    }
    headers.insert("server", http::HeaderValue::from_static("sigil"));

    response
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use http_body_util::Full;
    use hyper::service::Service;
    use sigil_auth::{
        Credential, Identity, RequestSigner, StaticCredentialProvider, VerifierConfig,
    };

    use super::*;
    use crate::handler::HandlerFuture;
    use crate::response::json_response;

    const CREDENTIAL_ID: &str = "2a241ea1e4672ee9";
    const SECRET: &str = "b1946ac92492d2347c6235b4d2611184";

    /// Echoes what it was handed as JSON.
    #[derive(Debug)]
    struct EchoHandler;

    impl AuthenticatedHandler for EchoHandler {
        fn handle(&self, ctx: AuthContext, req: http::Request<Bytes>) -> HandlerFuture {
            Box::pin(async move {
                let json = serde_json::json!({
                    "authenticated": ctx.is_authenticated(),
                    "identity": ctx.identity().map(Identity::as_str),
                    "reason": ctx.result.reason(),
                    "requestId": ctx.request_id,
                    "bodyLen": req.body().len(),
                });
                json_response(http::StatusCode::OK, &json, &ctx.request_id)
            })
        }
    }

    fn service(config: AuthLayerConfig) -> AuthService<StaticCredentialProvider, EchoHandler> {
        let provider = StaticCredentialProvider::new(vec![Credential::new(
            CREDENTIAL_ID,
            SECRET,
            Identity::new("user-42"),
        )]);
        AuthService::new(
            SignatureVerifier::new(provider, VerifierConfig::default()),
            Arc::new(EchoHandler),
            config,
        )
    }

    fn signed_request(body: &'static [u8]) -> http::Request<Full<Bytes>> {
        let mut req = http::Request::builder()
            .method("POST")
            .uri("/v1/items?page=1")
            .header("host", "api.example.com")
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from_static(body)))
            .unwrap();
        RequestSigner::new(CREDENTIAL_ID, SECRET, VerifierConfig::default())
            .sign(&mut req, body, Utc::now())
            .unwrap();
        req
    }

    fn anonymous_request() -> http::Request<Full<Bytes>> {
        http::Request::builder()
            .uri("/v1/items")
            .header("host", "api.example.com")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    async fn json_body(resp: http::Response<SigilResponseBody>) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_should_forward_authenticated_request_with_identity() {
        let resp = service(AuthLayerConfig::default())
            .call(signed_request(br#"{"name":"widget"}"#))
            .await
            .unwrap();

        assert_eq!(resp.status(), http::StatusCode::OK);
        let request_id = resp.headers()[REQUEST_ID_HEADER].to_str().unwrap().to_owned();
        let json = json_body(resp).await;
        assert_eq!(json["authenticated"], true);
        assert_eq!(json["identity"], "user-42");
        assert_eq!(json["reason"], "authenticated");
        assert_eq!(json["bodyLen"], 17);
        assert_eq!(json["requestId"], request_id.as_str());
    }

    #[tokio::test]
    async fn test_should_forward_anonymous_context_by_default() {
        let resp = service(AuthLayerConfig::default())
            .call(anonymous_request())
            .await
            .unwrap();

        assert_eq!(resp.status(), http::StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["authenticated"], false);
        assert!(json["identity"].is_null());
        assert_eq!(json["reason"], "no valid authorization header");
    }

    #[tokio::test]
    async fn test_should_reject_with_401_without_reason() {
        let config = AuthLayerConfig::builder().reject_unauthenticated(true).build();
        let resp = service(config).call(anonymous_request()).await.unwrap();

        assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);
        assert!(resp.headers().contains_key(REQUEST_ID_HEADER));
        let json = json_body(resp).await;
        assert_eq!(json["error"], "unauthorized");
        assert!(json.get("reason").is_none());
    }

    #[tokio::test]
    async fn test_should_expose_reason_when_configured() {
        let config = AuthLayerConfig::builder()
            .reject_unauthenticated(true)
            .expose_reasons(true)
            .build();
        let mut req = signed_request(b"original");
        *req.body_mut() = Full::new(Bytes::from_static(b"tampered"));

        let resp = service(config).call(req).await.unwrap();
        assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);
        let json = json_body(resp).await;
        assert_eq!(json["reason"], "content hash does not match");
    }

    #[tokio::test]
    async fn test_should_answer_413_over_body_limit() {
        let config = AuthLayerConfig::builder().max_body_bytes(4).build();
        let resp = service(config)
            .call(signed_request(b"more than four bytes"))
            .await
            .unwrap();

        assert_eq!(resp.status(), http::StatusCode::PAYLOAD_TOO_LARGE);
        assert!(resp.headers().contains_key(REQUEST_ID_HEADER));
        let json = json_body(resp).await;
        assert_eq!(json["error"], "payload too large");
    }

    #[tokio::test]
    async fn test_should_accept_body_exactly_at_limit() {
        let config = AuthLayerConfig::builder().max_body_bytes(4).build();
        let resp = service(config).call(signed_request(b"four")).await.unwrap();
        assert_eq!(resp.status(), http::StatusCode::OK);
        assert_eq!(json_body(resp).await["authenticated"], true);
    }

    #[tokio::test]
    async fn test_should_reject_replayed_request_when_enabled() {
        let config = AuthLayerConfig::builder()
            .reject_unauthenticated(true)
            .expose_reasons(true)
            .replay_protection(true)
            .build();
        let service = service(config);

        let first = signed_request(b"{}");
        let (parts, body) = first.into_parts();
        let replay = http::Request::from_parts(parts.clone(), body.clone());
        let first = http::Request::from_parts(parts, body);

        let resp = service.call(first).await.unwrap();
        assert_eq!(resp.status(), http::StatusCode::OK);

        let resp = service.call(replay).await.unwrap();
        assert_eq!(resp.status(), http::StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(resp).await["reason"],
            "request has already been seen"
        );
    }

    #[tokio::test]
    async fn test_should_allow_repeats_without_replay_protection() {
        let service = service(AuthLayerConfig::default());
        let (parts, body) = signed_request(b"{}").into_parts();

        for _ in 0..2 {
            let req = http::Request::from_parts(parts.clone(), body.clone());
            let resp = service.call(req).await.unwrap();
            assert_eq!(json_body(resp).await["authenticated"], true);
        }
    }

    #[tokio::test]
    async fn test_should_assign_distinct_request_ids() {
        let service = service(AuthLayerConfig::default());
        let a = service.call(anonymous_request()).await.unwrap();
        let b = service.call(anonymous_request()).await.unwrap();
        assert_ne!(a.headers()[REQUEST_ID_HEADER], b.headers()[REQUEST_ID_HEADER]);
        assert_eq!(a.headers()["server"], "sigil");
    }

    /// Provider whose lookups block the calling thread.
    #[derive(Debug)]
    struct SlowProvider {
        inner: StaticCredentialProvider,
        delay: std::time::Duration,
    }

    impl CredentialProvider for SlowProvider {
        fn lookup(
            &self,
            credential_id: &str,
        ) -> Result<Option<Credential>, sigil_auth::CredentialStoreError> {
            std::thread::sleep(self.delay);
            self.inner.lookup(credential_id)
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_should_keep_runtime_responsive_during_slow_lookup() {
        let provider = SlowProvider {
            inner: StaticCredentialProvider::new(vec![Credential::new(
                CREDENTIAL_ID,
                SECRET,
                Identity::new("user-42"),
            )]),
            delay: std::time::Duration::from_millis(400),
        };
        let service = AuthService::new(
            SignatureVerifier::new(provider, VerifierConfig::default()),
            Arc::new(EchoHandler),
            AuthLayerConfig::default(),
        );

        let start = std::time::Instant::now();
        let call = tokio::spawn(service.call(signed_request(b"{}")));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let ticked_after = start.elapsed();

        let resp = call.await.unwrap().unwrap();
        assert!(
            ticked_after < std::time::Duration::from_millis(300),
            "timer stalled for {ticked_after:?}"
        );
        assert!(start.elapsed() >= std::time::Duration::from_millis(400));
        assert_eq!(json_body(resp).await["identity"], "user-42");
    }

    /// Body whose stream fails on the first read.
    #[derive(Debug)]
    struct FailingBody;

    impl http_body::Body for FailingBody {
        type Data = Bytes;
        type Error = std::io::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Option<Result<http_body::Frame<Self::Data>, Self::Error>>> {
            std::task::Poll::Ready(Some(Err(std::io::Error::other("connection reset"))))
        }
    }

    #[tokio::test]
    async fn test_should_answer_400_for_unreadable_body() {
        let req = http::Request::builder()
            .method("POST")
            .uri("/v1/items")
            .body(FailingBody)
            .unwrap();
        let resp = service(AuthLayerConfig::default()).call(req).await.unwrap();

        assert_eq!(resp.status(), http::StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"], "unreadable request body");
    }
}
