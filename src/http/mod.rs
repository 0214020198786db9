//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, caller deadline header)
//!     → quote.rs (engine outcome → 200 JSON or 504)
//!     → Send to client
//! ```

pub mod quote;
pub mod request;
pub mod server;

pub use request::{X_REQUEST_ID, X_REQUEST_TIMEOUT_MS};
pub use server::{AppState, HttpServer};
