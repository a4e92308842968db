use serde::{Deserialize, Serialize};

/// A closed time interval in milliseconds.
///
/// `start <= end` always holds for values built through [`TimeRange::new`].
/// Deserialization does not check it. Both dataset layouts accepted by
/// `storyboard_core::parsers::parse_auto` reject a non-finite or inverted
/// range at any depth before a frame reaches navigation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    /// Returns `None` if `start > end` or either bound is not finite.
    pub fn new(start: f64, end: f64) -> Option<Self> {
        if start.is_finite() && end.is_finite() && start <= end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// A zero-length range at `t`.
    pub fn instant(t: f64) -> Self {
        Self { start: t, end: t }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Smallest range covering both `self` and `other`.
    pub fn union(&self, other: &TimeRange) -> TimeRange {
        TimeRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Identity of one dataset instance.
///
/// Every dataset replace bumps the generation; fetch results tagged with an
/// older generation are discarded without touching navigation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Generation {
        Generation(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

/// Location of a frame in the tree as a chain of sibling indices,
/// starting at the root sequence.
///
/// `[2]` is the third root frame, `[2, 0]` its first child.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct FrameAddress(pub Vec<usize>);

impl FrameAddress {
    pub fn root(index: usize) -> Self {
        Self(vec![index])
    }

    /// Address of the `index`-th child of this frame.
    pub fn child(&self, index: usize) -> Self {
        let mut indices = Vec::with_capacity(self.0.len() + 1);
        indices.extend_from_slice(&self.0);
        indices.push(index);
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl std::fmt::Display for FrameAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("/")?;
        for (i, idx) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{idx}")?;
        }
        Ok(())
    }
}

/// One row of the visible path: pagination cursor plus the parent frame
/// this row expands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoomLevel {
    /// Index of the first frame of the row currently paged into view.
    pub start: usize,
    /// Index into the parent row that this row is a child-expansion of.
    /// `None` for the root row.
    pub zoomed_from_frame: Option<usize>,
}

impl ZoomLevel {
    pub fn root() -> Self {
        Self {
            start: 0,
            zoomed_from_frame: None,
        }
    }

    pub fn zoomed_from(frame_index: usize) -> Self {
        Self {
            start: 0,
            zoomed_from_frame: Some(frame_index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_inverted_range() {
        assert!(TimeRange::new(5.0, 1.0).is_none());
        assert!(TimeRange::new(f64::NAN, 1.0).is_none());
        let r = TimeRange::new(1.0, 5.0).expect("ordered range");
        assert_eq!(r.duration(), 4.0);
        assert_eq!(TimeRange::instant(3.0).duration(), 0.0);
    }

    #[test]
    fn address_child_and_display() {
        let a = FrameAddress::root(2).child(0).child(7);
        assert_eq!(a.indices(), &[2, 0, 7]);
        assert_eq!(a.to_string(), "/2/0/7");
        assert!(FrameAddress::default().indices().is_empty());
    }

    #[test]
    fn root_level_serializes_null_parent() {
        let json = serde_json::to_string(&ZoomLevel::root()).expect("serialize");
        assert_eq!(json, r#"{"start":0,"zoomed_from_frame":null}"#);
    }

    #[test]
    fn generation_advances() {
        assert_eq!(Generation(3).next(), Generation(4));
        assert_eq!(Generation::default().to_string(), "gen0");
    }
}
