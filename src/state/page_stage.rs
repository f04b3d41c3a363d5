/// Page stage definitions for tracking a single page through the pipeline
///
/// A page moves forward through the stages in a fixed order. `Failed` can be
/// entered from any non-terminal stage; `Done` only from `Persisting`.
use crate::SalvageError;
use std::fmt;

/// Represents where a page is in the processing pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageStage {
    // ===== Active Stages =====
    /// Candidate URL waiting to be processed
    Pending,

    /// Looking up a usable capture in the archive
    Resolving,

    /// Taking delivery of and decoding the capture body
    Fetching,

    /// Selecting main content and the page title
    Extracting,

    /// Fetching referenced CSS, images and scripts
    DownloadingAssets,

    /// Writing the document to the output tree
    Persisting,

    // ===== Terminal Stages =====
    /// Page was stored and its checkpoint committed
    Done,

    /// Page could not be processed; eligible for retry on a later run
    Failed,
}

impl PageStage {
    /// Returns true if this is a terminal stage (no further processing)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns the stage that follows this one on the success path
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Resolving),
            Self::Resolving => Some(Self::Fetching),
            Self::Fetching => Some(Self::Extracting),
            Self::Extracting => Some(Self::DownloadingAssets),
            Self::DownloadingAssets => Some(Self::Persisting),
            Self::Persisting => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// Returns true if moving from this stage to `to` is allowed
    pub fn can_transition_to(&self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }

        to == Self::Failed || self.next() == Some(to)
    }

    /// Moves to `to`, or reports an `InvalidTransition`
    pub fn advance_to(self, to: Self) -> Result<Self, SalvageError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(SalvageError::InvalidTransition { from: self, to })
        }
    }

    /// Converts the stage to its string form used in logs and checkpoint details
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolving => "resolving",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::DownloadingAssets => "downloading_assets",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Parses a stage from its string form
    ///
    /// Returns None if the string doesn't match any known stage.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "resolving" => Some(Self::Resolving),
            "fetching" => Some(Self::Fetching),
            "extracting" => Some(Self::Extracting),
            "downloading_assets" => Some(Self::DownloadingAssets),
            "persisting" => Some(Self::Persisting),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all stages in pipeline order
    pub fn all_stages() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Resolving,
            Self::Fetching,
            Self::Extracting,
            Self::DownloadingAssets,
            Self::Persisting,
            Self::Done,
            Self::Failed,
        ]
    }
}

impl fmt::Display for PageStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
