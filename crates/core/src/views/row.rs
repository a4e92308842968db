use std::ops::Range;

use storyboard_protocol::{HierarchyLink, ParentAnchor, RowView, VisibleFrame};

use crate::error::NavError;
use crate::model::{Frame, FrameTree, VisiblePath, max_start};

/// Frames per page for a viewport: one frame per `frame_width_px`, minus one
/// for the navigation buttons, never less than one.
pub fn page_size_for_width(width_px: f64, frame_width_px: f64) -> usize {
    if !(width_px.is_finite() && frame_width_px.is_finite() && frame_width_px > 0.0) {
        return 1;
    }
    let slots = (width_px / frame_width_px).floor();
    if slots <= 2.0 {
        1
    } else {
        (slots as usize) - 1
    }
}

/// Indices of the page starting at `start`, clipped to the row.
pub fn visible_range(start: usize, page_size: usize, len: usize) -> Range<usize> {
    let from = start.min(len);
    let to = start.saturating_add(page_size.max(1)).min(len);
    from..to
}

fn visible_frame(index: usize, frame: &Frame) -> VisibleFrame {
    VisibleFrame {
        index,
        id: frame.id,
        time_range: frame.time_range,
        children_unloaded: frame.children.is_unloaded(),
        childless: frame
            .children
            .as_slice()
            .is_some_and(<[Frame]>::is_empty),
    }
}

/// The visible page of the row at `depth`.
pub fn row_view(
    tree: &FrameTree,
    path: &VisiblePath,
    depth: usize,
    page_size: usize,
) -> Result<RowView, NavError> {
    let row = tree.row_at(path, depth)?;
    let start = path.level(depth).map_or(0, |level| level.start);
    let range = visible_range(start, page_size, row.len());
    let frames = row[range.clone()]
        .iter()
        .enumerate()
        .map(|(offset, frame)| visible_frame(range.start + offset, frame))
        .collect();

    Ok(RowView {
        depth,
        start,
        total: row.len(),
        frames,
        can_page_left: start > 0,
        can_page_right: start < max_start(page_size, row.len()),
        zoomed_child: path.zoomed_child(depth),
    })
}

/// Views of every row of the path, top to bottom. Stops at the first row
/// that cannot be resolved.
pub fn row_views(tree: &FrameTree, path: &VisiblePath, page_size: usize) -> Vec<RowView> {
    (0..path.len())
        .map_while(|depth| row_view(tree, path, depth, page_size).ok())
        .collect()
}

/// Where the indicator from each child row to its parent frame starts.
///
/// No link is produced for a row, or a parent row, with nothing visible.
pub fn hierarchy_links(
    tree: &FrameTree,
    path: &VisiblePath,
    page_size: usize,
) -> Vec<HierarchyLink> {
    let rows = row_views(tree, path, page_size);
    rows.windows(2)
        .filter_map(|pair| {
            let (parent, child) = (&pair[0], &pair[1]);
            let zoomed_from_frame = parent.zoomed_child?;
            link_anchor(parent, child, zoomed_from_frame)
        })
        .collect()
}

fn link_anchor(parent: &RowView, child: &RowView, zoomed_from_frame: usize) -> Option<HierarchyLink> {
    if parent.is_empty() || child.is_empty() {
        return None;
    }
    let first_visible = parent.start;
    let last_visible = parent.start + parent.frames.len() - 1;
    let anchor = if zoomed_from_frame < first_visible {
        ParentAnchor::OffLeft
    } else if zoomed_from_frame > last_visible {
        ParentAnchor::OffRight
    } else {
        ParentAnchor::Visible {
            slot: zoomed_from_frame - first_visible,
        }
    };
    Some(HierarchyLink {
        depth: child.depth,
        zoomed_from_frame,
        anchor,
    })
}
