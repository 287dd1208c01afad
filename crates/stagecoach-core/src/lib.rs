//! # Stagecoach Core
//!
//! Core types for the Stagecoach request pipeline.
//!
//! This crate provides the foundational types used throughout Stagecoach:
//!
//! - [`RouteError`] / [`ErrorCode`] - The classified failure type and its codes
//! - [`ExecutionContext`] - The per-request accumulator of fields and parse results
//! - [`Request`] / [`Body`] - The transport-independent inbound request
//! - [`Reply`] - The response-shaped value produced by handlers and hooks

#![doc(html_root_url = "https://docs.rs/stagecoach-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
mod error;
pub mod reply;
mod request;

pub use context::{generate_request_id, ExecutionContext, Fields, PARSED_KEY, REQUEST_ID_FIELD};
pub use error::{Cause, ErrorCode, RouteError, RouteResult};
pub use reply::{Reply, Response};
pub use request::{Body, BodySource, HttpBody, MemoryBody, Request};
