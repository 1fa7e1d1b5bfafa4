mod errors;
mod logging;
mod mdns;
mod root;

pub use errors::ConfigError;
pub use logging::LoggingConfig;
pub use mdns::{MdnsConfig, MAX_MSG_ABSOLUTE};
pub use root::{CliOverrides, Config};
