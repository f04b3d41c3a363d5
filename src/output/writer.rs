//! Filesystem persistence for harvested pages
//!
//! # Layout
//!
//! ```text
//! {output_dir}/
//!   index.md                  root page
//!   About.md                  /about
//!   blog/
//!     My_first_post.md        /blog/my-first-post
//!     _assets/css/site.css    per-page layout
//!   _assets/...               shared layout
//! ```
//!
//! Directories mirror the URL path minus its last segment; the file is named
//! after the page title.

use crate::config::AssetLayout;
use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Longest file name stem produced by `sanitize_filename`
pub const FILENAME_MAX_LENGTH: usize = 100;

/// How many `-N` suffixes are tried before giving up
pub const FILENAME_COLLISION_LIMIT: u32 = 100;

/// Directory holding downloaded assets
pub const ASSETS_DIR_NAME: &str = "_assets";

/// File name stem of the root page
pub const INDEX_FILENAME_BASE: &str = "index";

const UNTITLED_FILENAME: &str = "untitled";

/// A converted page ready to be written
#[derive(Debug, Clone)]
pub struct Document<'a> {
    pub source_url: &'a Url,
    pub title: &'a str,
    pub capture_timestamp: NaiveDateTime,
    pub capture_url: &'a str,
    pub markdown: &'a str,
}

impl Document<'_> {
    /// Header line identifying the page a file belongs to
    fn source_line(&self) -> String {
        source_line(self.source_url.as_str())
    }

    fn render(&self) -> String {
        format!(
            "# {}\n\n{}\n_Archived Timestamp: {}_\n_Capture: {}_\n\n{}\n",
            self.title,
            self.source_line(),
            self.capture_timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.capture_url,
            self.markdown
        )
    }
}

fn source_line(source_url: &str) -> String {
    format!("_Source URL: {}_", source_url)
}

/// Writes documents, original HTML and computes asset locations
#[derive(Debug, Clone)]
pub struct DocumentWriter {
    output_dir: PathBuf,
}

impl DocumentWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Directory a page's document is written to
    ///
    /// Every path segment except the last becomes a sanitized directory.
    pub fn page_dir(&self, source_url: &Url) -> PathBuf {
        let segments = path_segments(source_url);
        let dir_count = segments.len().saturating_sub(1);

        let mut dir = self.output_dir.clone();
        for segment in &segments[..dir_count] {
            let safe = sanitize_filename(segment);
            if !safe.is_empty() {
                dir.push(safe);
            }
        }
        dir
    }

    /// Directory assets of a page are stored in
    pub fn asset_dir(&self, page_dir: &Path, layout: AssetLayout) -> PathBuf {
        match layout {
            AssetLayout::PerPage => page_dir.join(ASSETS_DIR_NAME),
            AssetLayout::Shared => self.output_dir.join(ASSETS_DIR_NAME),
        }
    }

    /// Writes the Markdown document and returns its path
    ///
    /// A file that already belongs to the same source URL is overwritten, so
    /// re-processing after a crash does not leave duplicates. Otherwise a
    /// free `-N` suffix is chosen.
    pub fn write_document(&self, document: &Document<'_>) -> io::Result<PathBuf> {
        let dir = self.page_dir(document.source_url);
        fs::create_dir_all(&dir)?;

        let stem = document_stem(document.source_url, document.title);
        let path = claim_path(&dir, &stem, "md", |candidate| {
            file_declares(candidate, &document.source_line())
        })?;

        fs::write(&path, document.render())?;
        Ok(path)
    }

    /// Writes the fetched HTML next to its document
    pub fn write_original(&self, document_path: &Path, html: &[u8]) -> io::Result<PathBuf> {
        let path = document_path.with_extension("html");
        fs::write(&path, html)?;
        Ok(path)
    }
}

/// File name stem for a page: `index` for the root, else the sanitized title
pub fn document_stem(source_url: &Url, title: &str) -> String {
    if path_segments(source_url).is_empty() {
        INDEX_FILENAME_BASE.to_string()
    } else {
        sanitize_filename(title)
    }
}

/// Sanitizes a string to be used as a file name
///
/// Removes `\ / * ? : ' " < > |`, trims spaces and dots, turns spaces into
/// underscores and caps the length. An empty result becomes `untitled`.
///
/// # Examples
///
/// ```
/// use wayback_salvage::output::sanitize_filename;
///
/// assert_eq!(sanitize_filename("What's new? (2020)"), "Whats_new_(2020)");
/// assert_eq!(sanitize_filename(" ..."), "untitled");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | ':' | '\'' | '"' | '<' | '>' | '|'))
        .collect();

    let replaced = cleaned.trim_matches(|c| c == ' ' || c == '.').replace(' ', "_");
    let truncated: String = replaced.chars().take(FILENAME_MAX_LENGTH).collect();
    let result = truncated.trim_matches(|c| c == ' ' || c == '.');

    if result.is_empty() {
        UNTITLED_FILENAME.to_string()
    } else {
        result.to_string()
    }
}

/// File name for a downloaded asset
///
/// Uses the decoded last path segment with its stem sanitized. URLs without
/// one get `asset_{hash}.bin`.
pub fn asset_file_name(asset_url: &str) -> String {
    let segment = Url::parse(asset_url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(|s| s.to_string()))
        })
        .map(|raw| {
            urlencoding::decode(&raw)
                .map(|s| s.into_owned())
                .unwrap_or(raw)
        })
        .unwrap_or_default();

    if segment.is_empty() {
        let digest = hex::encode(Sha256::digest(asset_url.as_bytes()));
        return format!("asset_{}.bin", &digest[..12]);
    }

    let path = Path::new(&segment);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&segment);
    let safe_stem = sanitize_filename(stem);

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}.{}", safe_stem, sanitize_filename(ext)),
        None => safe_stem,
    }
}

/// Picks a free path in `dir` for `file_name`, adding `-N` before the
/// extension on collision
pub fn unique_path(dir: &Path, file_name: &str) -> io::Result<PathBuf> {
    unique_path_with(dir, file_name, |_| false)
}

/// Like `unique_path`, but an existing file that `reusable` accepts is
/// returned instead of being skipped
pub fn unique_path_with(
    dir: &Path,
    file_name: &str,
    reusable: impl Fn(&Path) -> bool,
) -> io::Result<PathBuf> {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    claim_path(dir, stem, ext, reusable)
}

/// Writes `body` to `path` via an fsynced sibling temp file and a rename
///
/// Readers see either the previous file or the complete new one.
pub fn write_atomic(path: &Path, body: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    let mut file = fs::File::create(&tmp)?;
    file.write_all(body)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path)?;

    // Persist the rename itself; not every platform can open a directory
    if let Some(parent) = path.parent() {
        let dir = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        if let Ok(handle) = fs::File::open(dir) {
            let _ = handle.sync_all();
        }
    }

    Ok(())
}

/// Returns the first candidate path that is free or that `reusable` accepts
fn claim_path(
    dir: &Path,
    stem: &str,
    ext: &str,
    reusable: impl Fn(&Path) -> bool,
) -> io::Result<PathBuf> {
    let name = |suffix: Option<u32>| {
        let base = match suffix {
            Some(n) => format!("{}-{}", stem, n),
            None => stem.to_string(),
        };
        if ext.is_empty() {
            base
        } else {
            format!("{}.{}", base, ext)
        }
    };

    let first = dir.join(name(None));
    if !first.exists() || reusable(&first) {
        return Ok(first);
    }

    for n in 1..=FILENAME_COLLISION_LIMIT {
        let candidate = dir.join(name(Some(n)));
        if !candidate.exists() || reusable(&candidate) {
            return Ok(candidate);
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!(
            "no free file name for '{}' in {} after {} attempts",
            stem,
            dir.display(),
            FILENAME_COLLISION_LIMIT
        ),
    ))
}

/// Returns true if one of the first header lines of `path` equals `line`
fn file_declares(path: &Path, line: &str) -> bool {
    let Ok(file) = fs::File::open(path) else {
        return false;
    };

    BufReader::new(file)
        .lines()
        .take(5)
        .map_while(Result::ok)
        .any(|l| l == line)
}

/// Relative path from `from_dir` to `to`, with `/` separators
///
/// Both paths must share a root (here: the output directory).
pub fn relative_path(from_dir: &Path, to: &Path) -> String {
    let from: Vec<Component> = from_dir.components().collect();
    let target: Vec<Component> = to.components().collect();

    let common = from
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    for _ in common..from.len() {
        parts.push("..".to_string());
    }
    for component in &target[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }

    parts.join("/")
}

fn path_segments(url: &Url) -> Vec<String> {
    url.path()
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            urlencoding::decode(s)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| s.to_string())
        })
        .collect()
}
