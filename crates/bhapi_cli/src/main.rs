//! bhapi - command-line driver for the C API generator
//!
//! Reads `bhapi.toml` (or the file given with `--config`), applies any
//! command-line overrides and runs one generation step.
//!
//! # Environment Variables
//!
//! - `BHAPI_LOG` - Log level (default: "info", "debug" with `--verbose`)

use anyhow::{Context, Result};
use bhapi_weld::build::{
    ApiBuilder, GeneratorConfig, VersionResolver, VersionSource, CONFIG_FILE_NAME,
};
use bhapi_weld::codegen::InfoFormat;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "bhapi", version, about = "Generate the Bohrium cross-module C API")]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless BHAPI_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Command,
}

/// Values taking precedence over the config file
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Provider C source holding the exported functions
    #[arg(long, global = true)]
    provider: Option<PathBuf>,

    /// Type definitions inlined into the header
    #[arg(long, global = true)]
    type_definitions: Option<PathBuf>,

    /// Opcode table (JSON)
    #[arg(long, global = true)]
    opcodes: Option<PathBuf>,

    /// Element-type table (JSON)
    #[arg(long, global = true)]
    types: Option<PathBuf>,

    /// Source root where git describe runs
    #[arg(long, global = true)]
    src_root: Option<PathBuf>,

    /// Fallback version file
    #[arg(long, global = true)]
    version_file: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, global = true)]
    out_dir: Option<PathBuf>,

    /// Info artifact format (json or python)
    #[arg(long, global = true)]
    format: Option<InfoFormat>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the generated header
    Header,
    /// Print the info artifact
    Info,
    /// Print the resolved version
    Version,
    /// Write the header and info artifact to the output directory
    #[command(alias = "all")]
    Generate,
    /// List the indexed API functions
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let config = cli.overrides.apply(config);
    debug!(?config, "effective configuration");

    match cli.command {
        Command::Header => {
            let header = ApiBuilder::from_config(&config)
                .generate_header()
                .context("Failed to generate the header")?;
            print!("{}", header);
        }
        Command::Info => {
            let info = ApiBuilder::from_config(&config)
                .generate_info()
                .context("Failed to generate the info artifact")?;
            print!("{}", info);
        }
        Command::Version => {
            let (version, source) = resolver(&config)
                .resolve_with_source()
                .context("Failed to resolve the version")?;
            let source = match source {
                VersionSource::Git => "git describe",
                VersionSource::File => "version file",
            };
            println!("{} ({})", version, source);
        }
        Command::Generate => {
            let output = ApiBuilder::from_config(&config)
                .build()
                .context("Failed to generate the C API")?;
            println!("Wrote {}", output.header_path.display());
            if let Some(info_path) = output.info_path {
                println!("Wrote {}", info_path.display());
            }
        }
        Command::List => {
            let module = ApiBuilder::from_config(&config)
                .api_module()
                .context("Failed to extract the API")?;
            for f in &module.functions {
                println!(
                    "{:>4}  {} {}{}",
                    f.index,
                    f.signature.return_type,
                    f.signature.symbol(&module.names.prefix),
                    f.signature.parameter_list
                );
            }
            println!("{} functions", module.table_len());
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("BHAPI_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the config file; a missing default file means defaults
fn load_config(path: Option<&Path>) -> Result<GeneratorConfig> {
    match path {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None if Path::new(CONFIG_FILE_NAME).is_file() => GeneratorConfig::load(CONFIG_FILE_NAME)
            .with_context(|| format!("Failed to load config {}", CONFIG_FILE_NAME)),
        None => {
            debug!("no {} found, using defaults", CONFIG_FILE_NAME);
            Ok(GeneratorConfig::default())
        }
    }
}

fn resolver(config: &GeneratorConfig) -> VersionResolver {
    let mut resolver = VersionResolver::new(&config.paths.src_root)
        .timeout(Duration::from_secs(config.metadata.git_timeout_secs));
    if let Some(ref file) = config.paths.version_file {
        resolver = resolver.fallback_file(file);
    }
    resolver
}

impl Overrides {
    fn apply(self, mut config: GeneratorConfig) -> GeneratorConfig {
        let paths = &mut config.paths;
        if self.provider.is_some() {
            paths.provider_source = self.provider;
        }
        if self.type_definitions.is_some() {
            paths.type_definitions = self.type_definitions;
        }
        if self.opcodes.is_some() {
            paths.opcodes = self.opcodes;
        }
        if self.types.is_some() {
            paths.types = self.types;
        }
        if self.version_file.is_some() {
            paths.version_file = self.version_file;
        }
        if let Some(src_root) = self.src_root {
            paths.src_root = src_root;
        }
        if let Some(out_dir) = self.out_dir {
            paths.out_dir = out_dir;
        }
        if let Some(format) = self.format {
            config.metadata.format = format;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let cli =
            Cli::try_parse_from(["bhapi", "all", "--out-dir", "gen", "--format", "python"]).unwrap();
        assert!(matches!(cli.command, Command::Generate));
        assert_eq!(cli.overrides.out_dir, Some(PathBuf::from("gen")));
        assert_eq!(cli.overrides.format, Some(InfoFormat::Python));

        let cli = Cli::try_parse_from(["bhapi", "-v", "list", "--provider", "api.c"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::List));

        assert!(Cli::try_parse_from(["bhapi", "info", "--format", "yaml"]).is_err());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut config = GeneratorConfig::default();
        config.paths.provider_source = Some(PathBuf::from("from_config.c"));
        config.paths.opcodes = Some(PathBuf::from("opcodes.json"));

        let overrides = Overrides {
            provider: Some(PathBuf::from("from_flag.c")),
            out_dir: Some(PathBuf::from("gen")),
            ..Overrides::default()
        };
        let config = overrides.apply(config);

        assert_eq!(config.paths.provider_source, Some(PathBuf::from("from_flag.c")));
        assert_eq!(config.paths.opcodes, Some(PathBuf::from("opcodes.json")));
        assert_eq!(config.paths.out_dir, PathBuf::from("gen"));
        assert_eq!(config.metadata.format, InfoFormat::Json);
    }

    #[test]
    fn test_explicit_missing_config_is_error() {
        assert!(load_config(Some(Path::new("/nonexistent/bhapi.toml"))).is_err());
    }
}
