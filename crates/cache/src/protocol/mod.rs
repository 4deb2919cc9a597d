//! Wire formats: frames and the records carried inside them

pub mod frame;
pub mod record;

pub use frame::{encode_frame, encode_frame_into, Frame, FrameReader, FrameRef, FRAME_HEADER_LEN};
pub use record::{deserialize, serialize, Record, RECORD_FRAME_TYPE, RECORD_HEADER_LEN};
