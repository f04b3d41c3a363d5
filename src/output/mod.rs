//! Output module for harvested pages and progress reports
//!
//! This module handles:
//! - Laying out page documents, original HTML and assets on disk
//! - File name sanitization and collision handling
//! - Checkpoint statistics for the `--stats` report

pub mod stats;
mod writer;

pub use stats::{load_statistics, print_statistics, CheckpointStatistics};
pub use writer::{
    asset_file_name, document_stem, relative_path, sanitize_filename, unique_path,
    unique_path_with, write_atomic, Document, DocumentWriter, ASSETS_DIR_NAME,
    FILENAME_COLLISION_LIMIT, FILENAME_MAX_LENGTH, INDEX_FILENAME_BASE,
};
