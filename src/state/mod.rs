//! State module for tracking page progress
//!
//! `PageStage` names the steps a candidate URL passes through on its way to a
//! stored document, and enforces their order.

mod page_stage;

pub use page_stage::PageStage;
