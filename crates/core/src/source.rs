use storyboard_protocol::{FetchRequest, FrameAddress, Generation};

use crate::error::FetchError;
use crate::model::{Frame, FrameTree};
use crate::session::FetchResponse;

/// Serves child fetches from a fully parsed dataset.
///
/// Every fetch returns one level: the addressed frame's children, each with
/// its own children left unloaded so that deeper levels are fetched on
/// demand as well.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    tree: FrameTree,
}

impl InMemorySource {
    pub fn new(roots: Vec<Frame>) -> Self {
        Self {
            tree: FrameTree::new(roots, Generation::default()),
        }
    }

    /// The root row as the navigation engine should first see it.
    pub fn top_level(&self) -> Vec<Frame> {
        self.tree.roots().iter().map(Frame::shallow).collect()
    }

    /// Children of the frame at `address`. A frame whose children are not
    /// part of the dataset has none.
    pub fn children(&self, address: &FrameAddress) -> Result<Vec<Frame>, FetchError> {
        let frame = self
            .tree
            .frame(address)
            .map_err(|_| FetchError::NotFound(address.clone()))?;
        Ok(frame
            .children
            .as_slice()
            .unwrap_or_default()
            .iter()
            .map(Frame::shallow)
            .collect())
    }

    pub fn respond(&self, request: &FetchRequest) -> FetchResponse {
        FetchResponse {
            ticket: request.ticket.clone(),
            result: self.children(&request.ticket.address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Children, FramePayload};
    use storyboard_protocol::{FetchTicket, TimeRange};

    fn frame(id: u64) -> Frame {
        Frame::new(id, TimeRange::instant(id as f64), FramePayload::default())
    }

    fn source() -> InMemorySource {
        let grandchild = frame(200);
        let child = frame(20).with_children(Children::from_vec(vec![grandchild]));
        InMemorySource::new(vec![
            frame(1).with_children(Children::Empty),
            frame(2).with_children(Children::from_vec(vec![child, frame(21)])),
            frame(3),
        ])
    }

    #[test]
    fn top_level_hides_children() {
        let top = source().top_level();
        assert_eq!(top.len(), 3);
        assert!(top.iter().all(|f| f.children.is_unloaded()));
    }

    #[test]
    fn serves_one_level_per_fetch() {
        let source = source();
        let children = source.children(&FrameAddress::root(1)).expect("listed frame");
        assert_eq!(children.iter().map(|f| f.id).collect::<Vec<_>>(), vec![20, 21]);
        assert!(children[0].children.is_unloaded());

        let grandchildren = source
            .children(&FrameAddress(vec![1, 0]))
            .expect("listed frame");
        assert_eq!(grandchildren.len(), 1);
    }

    #[test]
    fn leaf_and_unlisted_children_are_empty() {
        let source = source();
        assert_eq!(source.children(&FrameAddress::root(0)), Ok(Vec::new()));
        assert_eq!(source.children(&FrameAddress::root(2)), Ok(Vec::new()));
    }

    #[test]
    fn unknown_address_is_not_found() {
        let source = source();
        let address = FrameAddress(vec![1, 5]);
        assert_eq!(
            source.children(&address),
            Err(FetchError::NotFound(address.clone()))
        );
    }

    #[test]
    fn response_echoes_ticket() {
        let ticket = FetchTicket {
            id: 9,
            generation: Generation(4),
            address: FrameAddress::root(1),
        };
        let request = FetchRequest {
            ticket: ticket.clone(),
            time_range: TimeRange::instant(2.0),
            depth: 1,
        };
        let response = source().respond(&request);
        assert_eq!(response.ticket, ticket);
        assert!(response.result.is_ok_and(|frames| frames.len() == 2));
    }
}
