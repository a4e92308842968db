pub mod dataset;

use crate::model::Frame;
use storyboard_protocol::TimeRange;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("dataset: {0}")]
    Dataset(#[from] dataset::DatasetParseError),
    #[error("frames: {0}")]
    Frames(#[source] serde_json::Error),
    #[error("frame {id} has invalid time range {start}..{end}")]
    InvalidRange { id: u64, start: f64, end: f64 },
    #[error("unable to detect format")]
    UnknownFormat,
}

/// Auto-detect the dataset format and parse it.
///
/// Two layouts are accepted, both as a top-level JSON array:
/// 1. Serialized [`Frame`] values (elements carry `time_range`), as written
///    by this crate.
/// 2. The phenomena/events format (elements carry `phenomena`).
///
/// An empty array is an empty dataset in either layout. Serialized frames
/// are rejected if any frame, at any depth, has a non-finite bound or ends
/// before it starts.
pub fn parse_auto(data: &[u8]) -> Result<Vec<Frame>, ParseError> {
    let value: serde_json::Value =
        serde_json::from_slice(data).map_err(|e| ParseError::Dataset(e.into()))?;
    let Some(items) = value.as_array() else {
        return Err(ParseError::UnknownFormat);
    };
    let Some(first) = items.first() else {
        return Ok(Vec::new());
    };

    if first.get("time_range").is_some() {
        let frames: Vec<Frame> = serde_json::from_value(value).map_err(ParseError::Frames)?;
        check_ranges(&frames)?;
        return Ok(frames);
    }
    if first.get("phenomena").is_some() {
        return Ok(dataset::parse_dataset(data)?);
    }
    Err(ParseError::UnknownFormat)
}

fn check_ranges(frames: &[Frame]) -> Result<(), ParseError> {
    let mut stack: Vec<&Frame> = frames.iter().collect();
    while let Some(frame) = stack.pop() {
        let TimeRange { start, end } = frame.time_range;
        if TimeRange::new(start, end).is_none() {
            return Err(ParseError::InvalidRange {
                id: frame.id,
                start,
                end,
            });
        }
        if let Some(children) = frame.children.as_slice() {
            stack.extend(children);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Children, FramePayload};
    use storyboard_protocol::TimeRange;

    #[test]
    fn detects_phenomena_format() {
        let frames = parse_auto(br#"[{"phenomena": [{"timestamp": 1}]}]"#).expect("phenomena dataset");
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn detects_serialized_frames() {
        let original = vec![
            Frame::new(7, TimeRange::instant(3.0), FramePayload::default())
                .with_children(Children::Empty),
        ];
        let json = serde_json::to_vec(&original).expect("serialize");
        let parsed = parse_auto(&json).expect("serialized frames");
        assert_eq!(parsed, original);
    }

    #[test]
    fn rejects_inverted_serialized_range() {
        let json = br#"[{
            "id": 0,
            "time_range": {"start": 50.0, "end": 10.0},
            "payload": {"object": {"states": []}, "transformation": null},
            "children": {"state": "empty"}
        }]"#;
        assert!(matches!(
            parse_auto(json),
            Err(ParseError::InvalidRange { id: 0, .. })
        ));
    }

    #[test]
    fn rejects_invalid_range_below_the_root() {
        let inverted = TimeRange {
            start: 5.0,
            end: 1.0,
        };
        let bad_child = Frame::new(9, inverted, FramePayload::default());
        let root = Frame::new(1, TimeRange::instant(0.0), FramePayload::default())
            .with_children(Children::from_vec(vec![bad_child]));
        let json = serde_json::to_vec(&vec![root]).expect("serialize");
        assert!(matches!(
            parse_auto(&json),
            Err(ParseError::InvalidRange { id: 9, .. })
        ));
    }

    #[test]
    fn empty_array_is_empty_dataset() {
        assert!(matches!(parse_auto(b"[]"), Ok(frames) if frames.is_empty()));
    }

    #[test]
    fn rejects_unknown_shapes() {
        assert!(matches!(
            parse_auto(br#"{"frames": []}"#),
            Err(ParseError::UnknownFormat)
        ));
        assert!(matches!(
            parse_auto(br#"[{"name": "x"}]"#),
            Err(ParseError::UnknownFormat)
        ));
        assert!(matches!(parse_auto(b"not json"), Err(ParseError::Dataset(_))));
    }
}
