//! End-to-end tests for the pulse freshness cache.

mod harness;
mod scenarios;
