//! HTTP surface for report generation, execution and export.

mod server;

pub use server::{router, serve, ApiError};
