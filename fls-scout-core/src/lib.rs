pub mod config;
pub mod error;
pub mod pipeline;
pub mod probe;
pub mod report;

pub use config::ScoutConfig;
pub use error::{ConfigError, PublishError};
pub use pipeline::{RunOutcome, discover_candidates, run};
pub use report::{PublishOutcome, RunReport};
