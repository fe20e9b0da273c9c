//! Error types for blockmatch.

use thiserror::Error;

/// Result alias for blockmatch operations.
pub type BlockMatchResult<T> = std::result::Result<T, BlockMatchError>;

/// Errors that can occur when building images or running block matching.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum BlockMatchError {
    /// A region or image has an unusable size.
    #[error("invalid dimensions: {size:?}")]
    InvalidDimensions { size: Vec<usize> },
    /// A pixel buffer does not match the region it should cover.
    #[error("buffer size mismatch: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A region does not fit inside the region that should contain it.
    #[error("region {region} is outside {bounds}")]
    RegionOutOfBounds { region: String, bounds: String },
    /// Spacing or direction cannot map between index and physical space.
    #[error("invalid geometry: {reason}")]
    InvalidGeometry { reason: &'static str },
    /// The matcher is not configured well enough to run.
    #[error("configuration error: {0}")]
    Configuration(&'static str),
    /// Required input pixels are not present in an input's buffered region.
    #[error("{input} region unavailable: required {required}, buffered {available}")]
    InputRegionUnavailable {
        input: &'static str,
        required: String,
        available: String,
    },
    /// The streaming tile budget cannot be honored.
    #[error("streaming configuration error: {reason}")]
    StreamingConfiguration { reason: String },
    /// A metric or displacement strategy failed.
    #[error("strategy failed at site {site:?}: {reason}")]
    Strategy { site: Vec<i64>, reason: String },
    /// Execution stopped because cancellation was requested.
    #[error("execution cancelled")]
    Cancelled,
    /// Loading an image from disk failed.
    #[error("image io error: {reason}")]
    ImageIo { reason: String },
}

impl BlockMatchError {
    /// Creates a strategy error that is not yet attributed to a grid site.
    pub fn strategy(reason: impl Into<String>) -> Self {
        Self::Strategy {
            site: Vec::new(),
            reason: reason.into(),
        }
    }

    /// Attributes an error raised inside a strategy to the given grid site.
    ///
    /// Strategy errors keep their reason; any other error is folded into a
    /// strategy error so the failing site is always reported.
    pub fn at_site(self, site: &[i64]) -> Self {
        match self {
            Self::Strategy { reason, .. } => Self::Strategy {
                site: site.to_vec(),
                reason,
            },
            Self::Cancelled => Self::Cancelled,
            other => Self::Strategy {
                site: site.to_vec(),
                reason: other.to_string(),
            },
        }
    }

    /// Like [`at_site`](Self::at_site), but keeps a site the strategy already
    /// reported.
    pub fn or_at_site(self, site: &[i64]) -> Self {
        if matches!(&self, Self::Strategy { site: located, .. } if !located.is_empty()) {
            self
        } else {
            self.at_site(site)
        }
    }
}
