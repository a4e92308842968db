use serde::{Deserialize, Serialize};

/// A user action delivered by a presentation layer's input handling.
///
/// Each intent addresses a row by its depth in the visible path. Frame
/// indices are absolute positions within that row, not page-relative slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavIntent {
    /// Page the row at `depth` towards its first frame.
    PageLeft { depth: usize },
    /// Page the row at `depth` towards its last frame.
    PageRight { depth: usize },
    /// Zoom into the children of `frame` in the row at `depth`.
    FrameClick { depth: usize, frame: usize },
    /// Jump the row at `depth` so that `frame` becomes the first visible frame.
    ScrubClick { depth: usize, frame: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_json_shape() {
        let intent: NavIntent =
            serde_json::from_str(r#"{"kind":"frame_click","depth":1,"frame":4}"#)
                .expect("frame click");
        assert_eq!(intent, NavIntent::FrameClick { depth: 1, frame: 4 });
    }
}
