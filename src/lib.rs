//! Turnstile - In-Process Admission Control Service
//!
//! This crate implements an admission-control layer that decides, per
//! request and per client, whether a request may proceed or must be
//! rejected. Three interchangeable rate limiting algorithms back the
//! decision: fixed window, sliding window, and token bucket. Idle client
//! state is reclaimed by background expiry sweepers.

pub mod admission;
pub mod config;
pub mod error;
pub mod grpc;
