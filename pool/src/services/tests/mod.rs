//! Service tests

mod docker;
