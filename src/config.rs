use std::path::PathBuf;

use serde::Deserialize;

/// Optional TOML configuration for the demo binary (SPEC_FULL.md §6).
///
/// The library itself never reads this — `SdCard`/`SpiSram` take plain
/// constructor arguments — this exists purely so the CLI layer has
/// somewhere to put persisted defaults, matching the teacher's declared
/// (but previously unused) `serde`/`toml` dependencies.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub sd_directory: Option<PathBuf>,
    #[serde(default = "default_sram_enabled")]
    pub sram_enabled: bool,
}

fn default_sram_enabled() -> bool {
    true
}

impl Config {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}
