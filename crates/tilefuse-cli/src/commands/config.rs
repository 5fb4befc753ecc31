use anyhow::Result;
use tilefuse_core::pipeline::config::StitchConfig;

/// Print a full default StitchConfig as TOML to stdout.
pub fn run() -> Result<()> {
    let config = StitchConfig::default();
    let toml_str = toml::to_string_pretty(&config)?;
    print!("{}", toml_str);
    Ok(())
}
