//! Schema Check CLI
//!
//! Loads the built-in poll schema, reports its relations, lints it and
//! prints its fingerprint. `config` shows the effective configuration.

use clap::{Parser, Subcommand};
use poll_schema::{AppConfig, Checksum, RelationGraph, SchemaLinter, SchemaRegistry};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-check")]
#[command(about = "Load, lint and describe the poll schema")]
struct Cli {
    /// Config file to load (optional)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the schema and list its relations
    Check,

    /// Print the resolved schema as JSON
    Describe,

    /// Run the schema lints
    Lint {
        /// Fail on warnings too
        #[arg(long)]
        deny_warnings: bool,
    },

    /// Show the effective configuration, or write a default config file
    Config {
        /// Output as TOML instead of the summary
        #[arg(long, conflicts_with = "json")]
        toml: bool,

        /// Output as JSON instead of the summary
        #[arg(long)]
        json: bool,

        /// Write the default configuration to this path and exit
        #[arg(long, value_name = "PATH")]
        init: Option<String>,
    },

    /// Print the schema fingerprint, optionally comparing it to a known one
    Fingerprint {
        /// Expected checksum (full or short form)
        #[arg(short, long)]
        expect: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Commands::Config { init: Some(path), .. } = &cli.command {
        AppConfig::default().save(path)?;
        println!("✅ Created config file: {}", path);
        return Ok(());
    }

    let config = AppConfig::load_from(cli.config.as_deref())?;
    let registry = SchemaRegistry::builtin()?;

    match cli.command {
        Commands::Config { toml, json, .. } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else if toml {
                println!("{}", ::toml::to_string_pretty(&config)?);
            } else {
                println!("📋 Effective configuration ({})", cli.config.as_deref().unwrap_or("default sources"));
                println!("  store.on_delete      = {:?}", config.store.on_delete);
                println!("  lint.deny_warnings   = {}", config.lint.deny_warnings);
                println!("  export.output_format = {:?}", config.export.output_format);
            }
        }

        Commands::Check => {
            println!(
                "✅ Schema loaded: {} lists, {} relations",
                registry.list_count(),
                registry.relations().len()
            );
            for relation in registry.relations() {
                println!(
                    "   {} <-> {} ({:?})",
                    registry.end_name(&relation.left),
                    registry.end_name(&relation.right),
                    relation.cardinality()
                );
            }

            let graph = RelationGraph::new(&registry);
            for (id, list) in registry.lists() {
                println!(
                    "   {}: {} outgoing, {} incoming",
                    list.key,
                    graph.refs_out(id).len(),
                    graph.refs_in(id).len()
                );
            }
        }

        Commands::Describe => {
            println!("{}", config.export.output_format.render(&registry.describe())?);
        }

        Commands::Lint { deny_warnings } => {
            let deny_warnings = deny_warnings || config.lint.deny_warnings;
            let results = SchemaLinter::new().lint(&registry);

            let mut failed = false;
            for result in &results {
                for error in &result.errors {
                    println!("❌ [{}] {}: {}", error.code, error.path, error.message);
                }
                for warning in &result.warnings {
                    println!("⚠️  [{}] {}: {}", warning.code, warning.path, warning.message);
                }
                if !result.is_clean() || (deny_warnings && result.has_warnings()) {
                    failed = true;
                }
            }

            if failed {
                println!("\n❌ Lint failed");
                std::process::exit(1);
            }
            println!("✅ Lint passed ({} lists with findings)", results.len());
        }

        Commands::Fingerprint { expect } => {
            let checksum = registry.checksum();
            println!("{}", checksum);

            if let Some(expected) = expect {
                let matches = if expected.len() == checksum.short().len() {
                    expected == checksum.short()
                } else {
                    Checksum::from(expected.as_str()) == *checksum
                };
                if !matches {
                    eprintln!("❌ Fingerprint mismatch: expected {}", expected);
                    std::process::exit(1);
                }
                println!("✅ Fingerprint matches");
            }
        }
    }

    Ok(())
}
