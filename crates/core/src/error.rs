use storyboard_protocol::FrameAddress;
use thiserror::Error;

/// Failure reported by a dataset fetch collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("no frame at {0}")]
    NotFound(FrameAddress),
}

/// Navigation and tree errors. All of them are recoverable: none leave the
/// visible path partially mutated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavError {
    /// A row's ancestor chain passes through a frame whose children are not
    /// loaded yet.
    #[error("row at depth {depth} is not resolved yet")]
    UnresolvedRow { depth: usize },
    /// A depth, frame index, or address no longer exists.
    #[error("index {index} out of range at depth {depth} (len {len})")]
    IndexOutOfRange {
        depth: usize,
        index: usize,
        len: usize,
    },
    #[error("fetching children of {address} failed: {source}")]
    FetchFailure {
        address: FrameAddress,
        #[source]
        source: FetchError,
    },
    /// Children of a frame were resolved twice. Indicates a single-flight bug
    /// in the loader.
    #[error("children of {address} are already resolved")]
    AlreadyResolved { address: FrameAddress },
    /// Attempted to "resolve" a frame's children back to `Unloaded`.
    #[error("cannot resolve children of {address} to unloaded")]
    InvalidResolution { address: FrameAddress },
}
