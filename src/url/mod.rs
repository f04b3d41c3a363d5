//! URL handling module for Wayback-Salvage
//!
//! Candidate URLs from the archive index are normalized into an identity form
//! and filtered against the configured target domain.

mod domain;
mod matcher;
mod normalize;

pub use domain::{extract_domain, is_in_target};
pub use matcher::matches_domain;
pub use normalize::normalize_url;
