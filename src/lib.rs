pub mod actors;
pub mod command;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod scheduler;
pub mod threshold;
pub mod util;

pub use command::{CommandMode, CommandSettings, CommandTrigger, ExecutionReport, Trigger};
pub use error::{ConfigError, ExecutionError, FetchError};
pub use fetcher::{HttpSource, MetricFetcher, MetricSource, RawResponse};
pub use threshold::{Direction, should_trigger};
