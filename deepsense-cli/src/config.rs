// deepsense-cli/src/config.rs
//
// Resolves the core configuration from an optional file plus DEEPSENSE_*
// environment overrides.

use deepsense_core::{CoreConfig, CoreResult};
use std::path::Path;

pub fn load_config(path: Option<&Path>) -> CoreResult<CoreConfig> {
    let mut config = match path {
        Some(path) => {
            log::debug!("Loading configuration from {}", path.display());
            CoreConfig::from_file(path)?
        }
        None => CoreConfig::default(),
    };
    config.apply_env_overrides();
    Ok(config)
}
