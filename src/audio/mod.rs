// Audio module - extension detection and tag/duration probing

pub mod detection;
pub mod metadata;

pub use detection::has_recognized_extension;
pub use metadata::{check_jingle_length, probe_track};
