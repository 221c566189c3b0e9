//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod alignment;
pub mod health;
pub mod verify;
pub mod watermark;

pub use crate::state::AppState;
pub use alignment::{alignment_handler, AlignmentRequest, AlignmentResponse};
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use verify::{verify_handler, VerifyResponse};
pub use watermark::{watermark_handler, WatermarkResponse};
