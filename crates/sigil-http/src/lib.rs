//! Authentication middleware for hyper services.
//!
//! [`AuthService`] sits in front of an [`AuthenticatedHandler`]. For every
//! request it:
//!
//! - **Collects** the body, answering `413` once it exceeds the configured
//!   limit
//! - **Authenticates** the request with a [`SignatureVerifier`] on tokio's
//!   blocking pool, so a credential store doing blocking I/O never stalls the
//!   async workers
//! - **Guards against replays** when [`AuthLayerConfig::replay_protection`]
//!   is set
//! - **Forwards** the request together with an explicit [`AuthContext`], or
//!   answers `401` when [`AuthLayerConfig::reject_unauthenticated`] is set
//!
//! [`SignatureVerifier`]: sigil_auth::SignatureVerifier

pub mod body;
pub mod config;
pub mod context;
pub mod handler;
pub mod replay;
pub mod response;
pub mod service;

pub use body::SigilResponseBody;
pub use config::AuthLayerConfig;
pub use context::AuthContext;
pub use handler::{AuthenticatedHandler, HandlerFuture};
pub use replay::ReplayGuard;
pub use service::AuthService;
