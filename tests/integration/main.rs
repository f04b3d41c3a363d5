//! Integration tests against a mock web archive
//!
//! These tests use wiremock to stand in for the CDX index, the replay
//! service and the Memento aggregator, and run pages through the pipeline
//! end-to-end.

mod assets_tests;
mod common;
mod fetcher_tests;
mod pipeline_tests;
