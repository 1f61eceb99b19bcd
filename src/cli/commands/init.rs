//! `init` writes a starter settings file; `config` prints the effective one.

use anyhow::anyhow;

use crate::config::Settings;

/// Write `.reloadwatch/settings.toml` with a sample Go handler.
///
/// Refusing to overwrite an existing file is `Settings::init_config_file`'s
/// call; its error is returned as is.
pub fn run_init(force: bool) -> anyhow::Result<()> {
    let path = Settings::init_config_file(force).map_err(|e| anyhow!("{e}"))?;
    println!("Wrote {}", path.display());
    println!("Edit its [[handlers]] entries to match your build targets.");
    Ok(())
}

/// Print the merged settings (defaults, file, `RW_` environment) as TOML.
pub fn run_config(settings: &Settings) -> anyhow::Result<()> {
    let rendered = toml::to_string_pretty(settings)?;
    println!("Effective settings");
    println!("{}", "-".repeat(18));
    println!("{rendered}");
    Ok(())
}
