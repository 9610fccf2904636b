pub mod metrics;
pub mod providers;

pub use metrics::{get_metrics, init_metrics};
pub use providers::{ImageProvider, MockImageProvider, ReplicateProvider};
