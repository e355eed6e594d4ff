//! Toolbox core command line - catalog inspection and config validation.
//!
//! Subcommands:
//! - prebuilt list / show: browse the prebuilt catalog
//! - validate: decode a tools document against the built-in kinds
//! - schema: JSON schema of a SQL tool configuration
//! - kinds: registered tool kinds

use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

use toolbox_core::tools::sql::SqlToolConfig;
use toolbox_core::tools::{parse_tools_file_with, KindRegistry, UnknownKinds};
use toolbox_core::{prebuilt, Config};

#[derive(Parser)]
#[command(name = "toolbox-core")]
#[command(about = "Inspect prebuilt tool catalogs and validate tools documents")]
#[command(version)]
struct Cli {
    /// Runtime config file (YAML)
    #[arg(long, env = "TOOLBOX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prebuilt catalog commands
    Prebuilt(PrebuiltArgs),
    /// Decode a tools document and report its tools and toolsets
    ///
    /// Tools whose kind is not built in are listed as skipped unless
    /// --strict is given.
    Validate {
        /// Path to the tools document
        file: PathBuf,
        /// Fail on tool kinds that are not built in
        #[arg(long)]
        strict: bool,
    },
    /// Print the JSON schema of a SQL tool configuration
    Schema,
    /// List registered tool kinds
    Kinds,
}

#[derive(Args)]
struct PrebuiltArgs {
    #[command(subcommand)]
    command: PrebuiltCommands,
}

#[derive(Subcommand)]
enum PrebuiltCommands {
    /// List backend kinds with a prebuilt configuration
    List,
    /// Print the prebuilt configuration of one backend kind
    Show {
        /// Backend kind, e.g. singlestore
        kind: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.config {
        Some(path) => {
            let config = Config::from_yaml_file(path)?;
            toolbox_core::observability::init_tracing_with(&config.observability);
        }
        None => toolbox_core::observability::init_tracing(),
    }

    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Commands::Prebuilt(args) => match args.command {
            PrebuiltCommands::List => {
                writeln!(stdout, "prebuilt bundle {}", prebuilt::bundle_version())?;
                for kind in prebuilt::get_prebuilt_sources()? {
                    writeln!(stdout, "  {}", kind)?;
                }
            }
            PrebuiltCommands::Show { kind } => {
                stdout.write_all(prebuilt::get(&kind)?)?;
            }
        },
        Commands::Validate { file, strict } => {
            let registry = KindRegistry::with_builtin_kinds()?;
            let raw = std::fs::read(&file)?;
            let unknown = if strict { UnknownKinds::Reject } else { UnknownKinds::Skip };
            let tools_file = parse_tools_file_with(&raw, &registry, unknown)?;

            tracing::info!(file = %file.display(), "tools document is valid");
            for (name, config) in &tools_file.tools {
                writeln!(stdout, "tool {} ({})", name, config.tool_config_kind())?;
            }
            for (name, kind) in &tools_file.skipped {
                writeln!(stdout, "skipped {} ({}: not a built-in kind)", name, kind)?;
            }
            for (name, members) in &tools_file.toolsets {
                writeln!(stdout, "toolset {}: {}", name, members.join(", "))?;
            }
        }
        Commands::Schema => {
            let schema = schemars::schema_for!(SqlToolConfig);
            writeln!(stdout, "{}", serde_json::to_string_pretty(&schema)?)?;
        }
        Commands::Kinds => {
            let registry = KindRegistry::with_builtin_kinds()?;
            for kind in registry.kinds() {
                writeln!(stdout, "{}", kind)?;
            }
        }
    }

    Ok(())
}
