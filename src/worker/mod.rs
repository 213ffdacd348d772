//! Worker communication module.
//!
//! SQL Server is reached through an external worker process. The worker
//! owns the driver; this side only speaks the protocol.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            WorkerClient (Tokio)          │
//! │  - Spawns the worker as a child process  │
//! │  - NDJSON protocol over stdin/stdout     │
//! │  - Request IDs correlate responses       │
//! └────────────────────┬─────────────────────┘
//!       stdin (NDJSON) │ stdout (NDJSON)
//!                      ▼
//! ┌──────────────────────────────────────────┐
//! │      Worker (long-running child)         │
//! └──────────────────────────────────────────┘
//! ```

mod client;
mod error;
pub mod protocol;

pub use client::WorkerClient;
pub use error::{WorkerError, WorkerResult};
