mod engine;
mod logging;

pub use engine::start_engine;
pub use logging::init_logging;

use ferrous_mdns_domain::{CliOverrides, Config};
use tracing::info;

pub fn load_config(path: Option<&str>, overrides: CliOverrides) -> anyhow::Result<Config> {
    let config = Config::load(path, overrides)?;
    config.validate()?;
    info!(interfaces = %config.mdns.interfaces, "Configuration loaded");
    Ok(config)
}
