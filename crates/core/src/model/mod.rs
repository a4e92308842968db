pub mod frame;
pub mod path;
pub mod tree;

pub use frame::{Children, Frame, FramePayload, ObjectState, ObjectTrack, Transformation};
pub use path::{InvalidPath, VisiblePath, max_start};
pub use tree::FrameTree;
