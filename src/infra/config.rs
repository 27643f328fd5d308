use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, DedupBackend, InitArgs, RunArgs};

/// Config file names looked up in the working directory, first match wins
const CONFIG_PATHS: [&str; 4] = ["jsonpot.toml", "jsonpot.yaml", "jsonpot.json", ".jsonpot.toml"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Converter program followed by its leading arguments. The document
    /// path, traversal root, and output path are appended per invocation.
    pub converter: Vec<String>,

    /// Deduplicator backend
    pub dedup: DedupBackend,

    /// Program used by the `msguniq` backend
    pub msguniq: String,

    /// Path components that exclude a document (test fixtures)
    pub exclude_segments: Vec<String>,

    /// File-name glob selecting source documents
    pub include_pattern: String,

    /// Extension appended to the document file name
    pub catalog_suffix: String,

    /// Follow symbolic links while walking
    pub follow_symlinks: bool,

    /// Per-invocation limit for external tools; unset waits forever
    pub timeout_secs: Option<u64>,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            converter: Vec::new(),
            dedup: DedupBackend::Msguniq,
            msguniq: "msguniq".to_string(),
            exclude_segments: vec!["tests".to_string()],
            include_pattern: "*.json".to_string(),
            catalog_suffix: "pot".to_string(),
            follow_symlinks: true,
            timeout_secs: None,
        }
    }
}

impl Config
{
    /// Fold command-line overrides into the loaded config.
    pub fn apply_args(
        &mut self,
        args: &RunArgs,
    )
    {
        if let Some(program) = &args.converter
        {
            self.converter = std::iter::once(program.clone())
                .chain(
                    args.converter_args
                        .iter()
                        .cloned(),
                )
                .collect();
        }

        if let Some(dedup) = args.dedup
        {
            self.dedup = dedup;
        }

        for segment in &args.exclude
        {
            if !self
                .exclude_segments
                .contains(segment)
            {
                self.exclude_segments
                    .push(segment.clone());
            }
        }

        if args
            .timeout
            .is_some()
        {
            self.timeout_secs = args.timeout;
        }
    }

    pub fn timeout(&self) -> Option<Duration>
    {
        self.timeout_secs
            .map(Duration::from_secs)
    }
}

pub fn load_config() -> Result<Config>
{
    load_config_from(Path::new("."))
}

/// Layer defaults, the first config file found in `dir`, then `JSONPOT__*`
/// environment variables.
pub fn load_config_from(dir: &Path) -> Result<Config>
{
    let mut builder = config::Config::builder();

    for name in &CONFIG_PATHS
    {
        let path = dir.join(name);
        if path.exists()
        {
            builder = builder.add_source(config::File::from(path));
            break;
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("JSONPOT")
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("converter")
            .with_list_parse_key("exclude_segments")
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
        .join(CONFIG_PATHS[0]);

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

    if ctx.dry_run
    {
        if !ctx.quiet
        {
            println!("Would write {}:\n{toml_string}", config_path.display());
        }
        return Ok(());
    }

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}
