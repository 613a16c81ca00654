use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};
use crate::core::apply_engine::EngineConfig;

/// Name written by `rpatch init`
pub const CONFIG_FILE: &str = "rpatch.toml";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Engine tunables: strategies, validation, patterns, protection, whitespace
    #[serde(flatten)]
    pub engine: EngineConfig,

    /// Human output settings
    pub output: OutputConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig
{
    /// Print results as JSON instead of a summary
    pub json: bool,
    /// Print the unified diff of applied changes
    pub show_diff: bool,
}

impl Default for OutputConfig
{
    fn default() -> Self
    {
        Self { json: false, show_diff: true }
    }
}

pub fn load_config() -> Result<Config>
{
    load_config_from(Path::new("."))
}

/// Layer the first config file found in `dir` and `RPATCH__*` env vars over defaults
pub fn load_config_from(dir: &Path) -> Result<Config>
{
    let mut builder = config::Config::builder();

    // Load from config files in priority order
    let config_paths = [CONFIG_FILE, ".rpatch.toml"];

    for name in &config_paths
    {
        let path = dir.join(name);
        if path.exists()
        {
            tracing::debug!(path = %path.display(), "loading config file");
            builder = builder.add_source(config::File::from(path));
            break;
        }
    }

    // RPATCH__STRATEGY__CHUNK_SIZE=200 style overrides
    builder = builder.add_source(
        config::Environment::with_prefix("RPATCH")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILE);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn defaults_when_no_file()
    {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(dir.path()).unwrap();

        assert_eq!(cfg.engine.strategy.chunk_size, 100);
        assert_eq!(cfg.engine.validation.max_line_length, 10_000);
        assert!(cfg.output.show_diff);
    }

    #[test]
    fn file_overrides_defaults()
    {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[strategy]\nchunk_size = 250\n\n[protection]\nmarkers = [\"FIXME\"]\n",
        )
        .unwrap();

        let cfg = load_config_from(dir.path()).unwrap();
        assert_eq!(cfg.engine.strategy.chunk_size, 250);
        assert_eq!(cfg.engine.strategy.hunk_search_radius, 100);
        assert_eq!(cfg.engine.protection.markers, vec!["FIXME".to_string()]);
    }

    #[test]
    fn default_config_round_trips_through_toml()
    {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.engine.strategy, Config::default().engine.strategy);
    }
}
