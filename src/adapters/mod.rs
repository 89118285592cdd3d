// Adapters layer: concrete implementations of the domain ports.

pub mod graph;
pub mod http;
pub mod recording;

pub use graph::TreeFileGraph;
pub use http::HttpChannel;
pub use recording::{RecordedCall, RecordingChannel};
