use serde::{Deserialize, Serialize};

use crate::types::TimeRange;

/// One frame of a row as a presentation layer should draw it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibleFrame {
    /// Absolute index within the row.
    pub index: usize,
    pub id: u64,
    pub time_range: TimeRange,
    /// Children have not been fetched yet; clicking will trigger a load.
    pub children_unloaded: bool,
    /// Children were fetched and there are none.
    pub childless: bool,
}

/// The visible page of one row of the storyboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowView {
    pub depth: usize,
    /// First visible index (the row's pagination cursor).
    pub start: usize,
    /// Number of frames in the whole row.
    pub total: usize,
    pub frames: Vec<VisibleFrame>,
    pub can_page_left: bool,
    pub can_page_right: bool,
    /// Index of the frame in this row that the next row expands, if any.
    pub zoomed_child: Option<usize>,
}

impl RowView {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Where a hierarchy indicator should start in the parent row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParentAnchor {
    /// The zoomed frame is on screen at this page slot.
    Visible { slot: usize },
    /// The zoomed frame is paged out to the left; anchor on the left edge of
    /// the parent row's first visible frame.
    OffLeft,
    /// The zoomed frame is paged out to the right; anchor on the right edge
    /// of the parent row's last visible frame.
    OffRight,
}

/// Indicator linking a child row to the parent frame it expands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyLink {
    /// Depth of the child row.
    pub depth: usize,
    /// Absolute index of the parent frame in the row at `depth - 1`.
    pub zoomed_from_frame: usize,
    pub anchor: ParentAnchor,
}

/// Granularity of time-axis ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    Millisecond,
    Centisecond,
    Decisecond,
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl TimeUnit {
    /// Nominal length in milliseconds. Months count 31 days and years 366,
    /// so these are upper bounds rather than calendar-exact lengths.
    pub fn millis(self) -> f64 {
        match self {
            Self::Millisecond => 1.0,
            Self::Centisecond => 10.0,
            Self::Decisecond => 100.0,
            Self::Second => 1_000.0,
            Self::Minute => 60_000.0,
            Self::Hour => 3_600_000.0,
            Self::Day => 86_400_000.0,
            Self::Month => 31.0 * 86_400_000.0,
            Self::Year => 366.0 * 86_400_000.0,
        }
    }
}

/// A labelled tick on the time scrubber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisTick {
    /// Timestamp in milliseconds.
    pub timestamp: f64,
    /// Horizontal position as a fraction of the axis width, in `[0, 1]`.
    pub position: f64,
    pub label: String,
}
