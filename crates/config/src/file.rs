use std::path::Path;

use crate::ConfigFile;

/// Parse a `camrelay.toml`-style file into a [`ConfigFile`].
pub fn load_config_file(path: &Path) -> anyhow::Result<ConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading config file {}: {e}", path.display()))?;
    toml::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("parsing config file {}: {e}", path.display()))
}
