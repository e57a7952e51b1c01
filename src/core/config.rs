mod parsing;
mod settings;
mod types;

pub(crate) use types::DelayRange;
pub use types::{ConfigError, Settings};
