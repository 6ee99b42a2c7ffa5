//! Service tests
//!
//! Launcher tests start real `sh` processes.

mod launcher;
