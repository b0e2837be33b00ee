// Re-export all model types from submodules.

pub use app::AppView;
pub use fleet::{DeployTarget, Deployment, Service, ServiceGroup, Task};
pub use logs::{LogBatch, LogEvent};
pub use release::{Image, RunStatus};
pub use traffic::{TargetGroupWeight, TrafficRule, MAX_WEIGHT};

mod app;
mod fleet;
mod logs;
mod release;
mod traffic;
