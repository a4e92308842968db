pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod navigation;
pub mod parsers;
pub mod session;
pub mod source;
pub mod views;

pub use config::{ConfigError, StoryboardConfig};
pub use error::{FetchError, NavError};
pub use loader::LoaderGate;
pub use model::{Children, Frame, FramePayload, FrameTree, VisiblePath};
pub use navigation::{Completion, Storyboard, Transition};
pub use session::{DatasetFetcher, FetchResponse, PresentationSink, Session};
pub use source::InMemorySource;
