//! Common test utilities and infrastructure
//!
//! Builds a pool whose controllers are wiremock servers reached through the
//! real HTTP client. The container runtime is mocked.

pub mod helpers;

pub use helpers::{body_json, controller, get, PoolHarness};
