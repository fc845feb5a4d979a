//! HTTP layer for yatube-rs.
//!
//! - **Endpoints**: feeds, post pages and forms, comments, follows, sign-in
//! - **Extractors**: authenticated user with login redirect, post form parsing
//! - **Middleware**: token authentication, home feed page cache
//!
//! Pages are returned as JSON `{template, context}` documents. Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod page_cache;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
