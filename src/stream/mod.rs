//! Streaming response pipeline
//!
//! The upstream reasoning loop produces newline-delimited raw-event
//! records; this module turns them into ordered client frames and writes
//! them to the downstream sink. Payload blocks embedded in tool output
//! are decoded here, never upstream.

mod event;
pub mod payload;
mod sink;
mod transform;

pub use event::{ClientFrame, RawEvent};
pub use payload::{
    DocumentPayload, ImagePayload, ListingPayload, OrganizationPayload, PayloadSet,
    ProviderPayload, SitePayload, VideoPayload,
};
pub use sink::FrameSink;
pub use transform::{frame_for_event, RawByteStream, StreamTransformer};
