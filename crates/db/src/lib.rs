pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod segmentation;

pub use connection::{connect, connect_with_config, connect_with_settings, ping, DbPool};
pub use segmentation::{SegmentationJob, SegmentationOutcome};
