pub mod fetch;
pub mod intent;
pub mod types;
pub mod view;

pub use fetch::{FetchRequest, FetchTicket};
pub use intent::NavIntent;
pub use types::{FrameAddress, Generation, TimeRange, ZoomLevel};
pub use view::{AxisTick, HierarchyLink, ParentAnchor, RowView, TimeUnit, VisibleFrame};
