//! HTTP surface for offhoursd
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/scheduler/status` | Current status snapshot |
//! | GET | `/scheduler/extend` | Extend the window by one hour, then status |
//! | GET | `/health` | Liveness of the manager |
//!
//! Handlers only forward to the manager through its handle; they never
//! touch the provider directly.

mod routes;
mod server;

pub use routes::*;
pub use server::*;

use std::net::SocketAddr;
use thiserror::Error;

/// HTTP server errors
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

pub type HttpResult<T> = Result<T, HttpError>;
