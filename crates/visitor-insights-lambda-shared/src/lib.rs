//! Shared infrastructure for the visitor insights AWS Lambda function.
//!
//! This crate provides the plumbing the handler builds on:
//!
//! - [`ProxyRequest`] / [`ProxyResponse`]: API Gateway proxy integration envelopes
//! - [`ErrorBody`]: uniform error payload
//! - [`HandlerConfig`]: configuration read once at cold start
//! - [`LogQueryService`]: analytics query seam, implemented for CloudWatch Logs
//!   Insights by [`CloudWatchLogsService`]
//! - [`LambdaRuntime`]: long-lived dependencies reused across invocations
//! - [`init_tracing`]: JSON-formatted tracing for CloudWatch Logs
//!
//! # Testing Support
//!
//! The [`test_utils`] module provides a scripted query service and proxy event
//! builders. Enable the `test-utils` feature to access it from dependent crates.

#![deny(warnings)]

mod cloudwatch;
mod config;
mod query;
mod requests;
mod response;
mod runtime;
mod tracing_init;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cloudwatch::CloudWatchLogsService;
pub use config::{EdgeLocationStrategy, HandlerConfig, PollPolicy, DEFAULT_LOG_REGION};
pub use query::{
    Clock, LogQueryService, QueryError, QueryHandle, QueryResults, QueryStatus, ResultField,
    SystemClock,
};
pub use requests::{Action, ProxyRequest, ACTION_PARAM};
pub use response::{cors_headers, ErrorBody, ProxyResponse, CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS};
pub use runtime::{init_runtime, LambdaRuntime};
pub use tracing_init::{filter_directive, init_tracing, DEFAULT_LOG_LEVEL};
