//! Common test utilities and infrastructure
//!
//! Builds a controller context over real pipe transports in a temporary
//! directory. Children are played by in-process responders.

pub mod helpers;

pub use helpers::{body_json, responder, ControllerHarness};
