//! HTTP service
//!
//! Editors request share tokens for objects; viewer clients resolve the token
//! they scanned back to an object id.

mod error;
mod http;

pub use error::{ApiError, INVALID_TOKEN_MESSAGE};
pub use http::{create_router, run, AppState, IssueRequest, IssueResponse, ResolveParams};
