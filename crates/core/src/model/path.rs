use serde::{Deserialize, Serialize};
use storyboard_protocol::ZoomLevel;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("a visible path needs a root level first and a parent index on every other level")]
pub struct InvalidPath;

/// Stack of zoom levels describing what is on screen; index = depth.
///
/// Never empty: level 0 is the root row and has no parent frame. Zooming
/// truncates below the zoom point and appends one level, which is the only
/// structural change the path supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ZoomLevel>", into = "Vec<ZoomLevel>")]
pub struct VisiblePath {
    levels: Vec<ZoomLevel>,
}

impl VisiblePath {
    /// A path showing only the root row from its first frame.
    pub fn new() -> Self {
        Self {
            levels: vec![ZoomLevel::root()],
        }
    }

    pub fn from_levels(levels: Vec<ZoomLevel>) -> Result<Self, InvalidPath> {
        let valid = levels
            .split_first()
            .is_some_and(|(root, rest)| {
                root.zoomed_from_frame.is_none()
                    && rest.iter().all(|l| l.zoomed_from_frame.is_some())
            });
        if valid {
            Ok(Self { levels })
        } else {
            Err(InvalidPath)
        }
    }

    pub fn levels(&self) -> &[ZoomLevel] {
        &self.levels
    }

    pub fn level(&self, depth: usize) -> Option<&ZoomLevel> {
        self.levels.get(depth)
    }

    /// Number of rows, always at least 1.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn deepest(&self) -> usize {
        self.levels.len() - 1
    }

    /// Parent index of the row at `depth + 1`, if that row exists.
    pub fn zoomed_child(&self, depth: usize) -> Option<usize> {
        self.levels
            .get(depth + 1)
            .and_then(|level| level.zoomed_from_frame)
    }

    /// Move the cursor of row `depth` left by `step`, stopping at 0.
    pub fn page_left(&mut self, depth: usize, step: usize) -> bool {
        let Some(level) = self.levels.get_mut(depth) else {
            return false;
        };
        let start = level.start.saturating_sub(step);
        let changed = start != level.start;
        level.start = start;
        changed
    }

    /// Move the cursor of row `depth` right by `step`, stopping where the
    /// last page is full.
    pub fn page_right(&mut self, depth: usize, step: usize, page_size: usize, row_len: usize) -> bool {
        let target = self
            .levels
            .get(depth)
            .map_or(0, |level| level.start.saturating_add(step));
        self.scrub_to(depth, target, page_size, row_len)
    }

    /// Set the cursor of row `depth` to `target`, clamped to the row.
    pub fn scrub_to(&mut self, depth: usize, target: usize, page_size: usize, row_len: usize) -> bool {
        let Some(level) = self.levels.get_mut(depth) else {
            return false;
        };
        let start = target.min(max_start(page_size, row_len));
        let changed = start != level.start;
        level.start = start;
        changed
    }

    /// Re-clamp the cursor of row `depth` after the page size or row length
    /// changed.
    pub fn clamp_start(&mut self, depth: usize, page_size: usize, row_len: usize) -> bool {
        let current = self.levels.get(depth).map_or(0, |level| level.start);
        self.scrub_to(depth, current, page_size, row_len)
    }

    /// Show the children of `frame_index` (in row `depth`) as row `depth + 1`.
    ///
    /// Returns `false` without touching the path if that row is already
    /// showing, or if `depth` is not a row of this path.
    pub fn zoom_into(&mut self, depth: usize, frame_index: usize) -> bool {
        if depth >= self.levels.len() || self.zoomed_child(depth) == Some(frame_index) {
            return false;
        }
        self.levels.truncate(depth + 1);
        self.levels.push(ZoomLevel::zoomed_from(frame_index));
        true
    }

    /// Back to a single root row at its first frame.
    pub fn reset(&mut self) {
        self.levels.clear();
        self.levels.push(ZoomLevel::root());
    }

    /// The `zoomed_from_frame` chain of rows `0..=depth`, used to detect
    /// whether a row still expands the same frames later on.
    pub fn lineage(&self, depth: usize) -> Vec<Option<usize>> {
        self.levels
            .iter()
            .take(depth + 1)
            .map(|level| level.zoomed_from_frame)
            .collect()
    }
}

impl Default for VisiblePath {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<ZoomLevel>> for VisiblePath {
    type Error = InvalidPath;

    fn try_from(levels: Vec<ZoomLevel>) -> Result<Self, Self::Error> {
        Self::from_levels(levels)
    }
}

impl From<VisiblePath> for Vec<ZoomLevel> {
    fn from(path: VisiblePath) -> Self {
        path.levels
    }
}

/// Largest valid cursor for a row: `max(0, row_len - page_size)`.
pub fn max_start(page_size: usize, row_len: usize) -> usize {
    row_len.saturating_sub(page_size.max(1))
}
