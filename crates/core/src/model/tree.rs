use storyboard_protocol::{FrameAddress, Generation};
use tracing::debug;

use crate::error::NavError;
use crate::model::frame::{Children, Frame};
use crate::model::path::VisiblePath;

/// The nested dataset: root frames plus everything loaded beneath them.
///
/// A tree is tagged with the [`Generation`] it was created under. Rows are
/// resolved against a [`VisiblePath`] by walking `zoomed_from_frame` indices.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameTree {
    roots: Vec<Frame>,
    generation: Generation,
}

impl FrameTree {
    pub fn new(roots: Vec<Frame>, generation: Generation) -> Self {
        Self { roots, generation }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn roots(&self) -> &[Frame] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Sibling frames shown at `depth` for the given path.
    ///
    /// Depth 0 is the root sequence; depth `k` is the children of
    /// `row_at(path, k - 1)[path[k].zoomed_from_frame]`.
    pub fn row_at(&self, path: &VisiblePath, depth: usize) -> Result<&[Frame], NavError> {
        if depth >= path.len() {
            return Err(NavError::IndexOutOfRange {
                depth,
                index: depth,
                len: path.len(),
            });
        }

        let mut row: &[Frame] = &self.roots;
        for (d, level) in path.levels().iter().enumerate().take(depth + 1).skip(1) {
            let Some(index) = level.zoomed_from_frame else {
                return Err(NavError::IndexOutOfRange {
                    depth: d,
                    index: 0,
                    len: row.len(),
                });
            };
            let parent = row.get(index).ok_or(NavError::IndexOutOfRange {
                depth: d - 1,
                index,
                len: row.len(),
            })?;
            row = parent
                .children
                .as_slice()
                .ok_or(NavError::UnresolvedRow { depth: d })?;
        }
        Ok(row)
    }

    pub fn row_len(&self, path: &VisiblePath, depth: usize) -> Result<usize, NavError> {
        self.row_at(path, depth).map(<[Frame]>::len)
    }

    /// Frame at absolute `index` in the row at `depth`.
    pub fn frame_at(
        &self,
        path: &VisiblePath,
        depth: usize,
        index: usize,
    ) -> Result<&Frame, NavError> {
        let row = self.row_at(path, depth)?;
        row.get(index).ok_or(NavError::IndexOutOfRange {
            depth,
            index,
            len: row.len(),
        })
    }

    /// Tree address of the frame at `index` in the row at `depth`.
    ///
    /// Validates the whole chain, so the returned address always resolves.
    pub fn address_of(
        &self,
        path: &VisiblePath,
        depth: usize,
        index: usize,
    ) -> Result<FrameAddress, NavError> {
        self.frame_at(path, depth, index)?;
        let mut indices: Vec<usize> = path
            .levels()
            .iter()
            .take(depth + 1)
            .filter_map(|level| level.zoomed_from_frame)
            .collect();
        indices.push(index);
        Ok(FrameAddress(indices))
    }

    /// Frame at a tree address.
    pub fn frame(&self, address: &FrameAddress) -> Result<&Frame, NavError> {
        let (&first, rest) = address
            .indices()
            .split_first()
            .ok_or(NavError::IndexOutOfRange {
                depth: 0,
                index: 0,
                len: self.roots.len(),
            })?;
        let mut frame = self.roots.get(first).ok_or(NavError::IndexOutOfRange {
            depth: 0,
            index: first,
            len: self.roots.len(),
        })?;
        for (d, &index) in rest.iter().enumerate() {
            let depth = d + 1;
            let row = frame
                .children
                .as_slice()
                .ok_or(NavError::UnresolvedRow { depth })?;
            frame = row.get(index).ok_or(NavError::IndexOutOfRange {
                depth,
                index,
                len: row.len(),
            })?;
        }
        Ok(frame)
    }

    fn frame_mut(&mut self, address: &FrameAddress) -> Result<&mut Frame, NavError> {
        let (&first, rest) = address
            .indices()
            .split_first()
            .ok_or(NavError::IndexOutOfRange {
                depth: 0,
                index: 0,
                len: self.roots.len(),
            })?;
        let roots_len = self.roots.len();
        let mut frame = self.roots.get_mut(first).ok_or(NavError::IndexOutOfRange {
            depth: 0,
            index: first,
            len: roots_len,
        })?;
        for (d, &index) in rest.iter().enumerate() {
            let depth = d + 1;
            let row = frame
                .children
                .as_mut_slice()
                .ok_or(NavError::UnresolvedRow { depth })?;
            let len = row.len();
            frame = row
                .get_mut(index)
                .ok_or(NavError::IndexOutOfRange { depth, index, len })?;
        }
        Ok(frame)
    }

    /// Resolve a frame's children. Allowed exactly once per frame.
    pub fn set_children(
        &mut self,
        address: &FrameAddress,
        children: Children,
    ) -> Result<(), NavError> {
        if children.is_unloaded() {
            return Err(NavError::InvalidResolution {
                address: address.clone(),
            });
        }
        let frame = self.frame_mut(address)?;
        if frame.children.is_resolved() {
            return Err(NavError::AlreadyResolved {
                address: address.clone(),
            });
        }
        let count = children.as_slice().map_or(0, <[Frame]>::len);
        frame.children = children;
        debug!(%address, count, "children resolved");
        Ok(())
    }
}
