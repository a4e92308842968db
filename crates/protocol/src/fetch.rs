use serde::{Deserialize, Serialize};

use crate::types::{FrameAddress, Generation, TimeRange};

/// Handle for one outstanding child fetch.
///
/// The ticket is the only thing a fetch collaborator has to hand back with
/// its result. The generation tag lets the core reject results that belong
/// to a dataset which has since been replaced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchTicket {
    /// Sequence number, unique per session.
    pub id: u64,
    pub generation: Generation,
    /// Frame whose children are being fetched.
    pub address: FrameAddress,
}

/// What a dataset fetch collaborator is asked to load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    /// Time range covered by the parent frame; the children lie within it.
    pub time_range: TimeRange,
    /// Nesting depth of the children being requested (root children are depth 1).
    pub depth: usize,
}
