use serde::{Deserialize, Serialize};
use storyboard_protocol::TimeRange;

/// One interval of the timeline together with the object it shows and the
/// transformation the object undergoes during that interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Identifier, unique within the sibling sequence.
    pub id: u64,
    pub time_range: TimeRange,
    pub payload: FramePayload,
    pub children: Children,
}

impl Frame {
    /// A frame whose children have not been fetched yet.
    pub fn new(id: u64, time_range: TimeRange, payload: FramePayload) -> Self {
        Self {
            id,
            time_range,
            payload,
            children: Children::Unloaded,
        }
    }

    pub fn with_children(mut self, children: Children) -> Self {
        self.children = children;
        self
    }

    pub fn duration(&self) -> f64 {
        self.time_range.duration()
    }

    /// Copy of this frame with its children reset to `Unloaded`.
    ///
    /// Used when serving one level of the tree at a time.
    pub fn shallow(&self) -> Frame {
        Frame {
            id: self.id,
            time_range: self.time_range,
            payload: self.payload.clone(),
            children: Children::Unloaded,
        }
    }
}

/// Resolution state of a frame's children.
///
/// `Unloaded` means existence is unknown and a fetch is required; it must
/// never be read as "no children".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "frames", rename_all = "snake_case")]
pub enum Children {
    #[default]
    Unloaded,
    Empty,
    Loaded(Vec<Frame>),
}

impl Children {
    /// Resolved children from a fetched sequence. An empty sequence is `Empty`.
    pub fn from_vec(frames: Vec<Frame>) -> Self {
        if frames.is_empty() {
            Self::Empty
        } else {
            Self::Loaded(frames)
        }
    }

    pub fn is_unloaded(&self) -> bool {
        matches!(self, Self::Unloaded)
    }

    pub fn is_resolved(&self) -> bool {
        !self.is_unloaded()
    }

    /// The resolved child sequence, or `None` while unloaded.
    pub fn as_slice(&self) -> Option<&[Frame]> {
        match self {
            Self::Unloaded => None,
            Self::Empty => Some(&[]),
            Self::Loaded(frames) => Some(frames),
        }
    }

    pub(crate) fn as_mut_slice(&mut self) -> Option<&mut [Frame]> {
        match self {
            Self::Unloaded => None,
            Self::Empty => Some(&mut []),
            Self::Loaded(frames) => Some(frames),
        }
    }
}

/// Data carried by a frame for the presentation layer. Navigation never
/// inspects it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FramePayload {
    pub object: ObjectTrack,
    pub transformation: Option<Transformation>,
}

/// Timestamped shapes of a tracked object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectTrack {
    pub states: Vec<ObjectState>,
}

/// Polygon outline of the object at one instant. Consecutive vertices form
/// an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectState {
    pub timestamp: f64,
    pub vertices: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transformation {
    Translation { dx: f64, dy: f64 },
    Scale { sx: f64, sy: f64 },
    Rotation { angle: f64 },
    Multiple { parts: Vec<Transformation> },
}

impl Transformation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Translation { .. } => "Translation",
            Self::Scale { .. } => "Scale",
            Self::Rotation { .. } => "Rotation",
            Self::Multiple { .. } => "Multiple",
        }
    }
}
