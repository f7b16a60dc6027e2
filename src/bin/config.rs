//! Schema Flow Config CLI
//!
//! View and manage schema-flow configuration.

use clap::{Parser, Subcommand};
use schema_flow::FlowConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "schema-flow-config")]
#[command(about = "View and manage schema-flow configuration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show current configuration
    Show {
        /// Config file to load (optional)
        #[arg(short, long)]
        config: Option<String>,

        /// Output as TOML
        #[arg(long)]
        toml: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Initialize a new config file
    Init {
        /// Output path (default: schema-flow.toml)
        #[arg(short, long, default_value = "schema-flow.toml")]
        output: PathBuf,

        /// Write to the per-user config directory instead
        #[arg(long, conflicts_with = "output")]
        user: bool,
    },

    /// Validate configuration
    Validate {
        /// Config file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Show { config, toml, json } => {
            let cfg = FlowConfig::load_from(config.as_deref())?;

            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else if toml {
                println!("{}", ::toml::to_string_pretty(&cfg)?);
            } else {
                println!("📋 Schema Flow Configuration\n");
                println!("Compile:");
                println!("  Max depth: {}", cfg.compile.max_depth);

                println!("\nLoader:");
                println!("  Schema path: {:?}", cfg.loader.schema_path);
                println!("  Fallback example: {}", cfg.loader.fallback_example);

                println!("\nLayout:");
                println!("  Enabled: {}", cfg.layout.enabled);
                println!("  Direction: {}", cfg.layout.direction);
                println!("  Rank separation: {}", cfg.layout.rank_separation);
                println!("  Node separation: {}", cfg.layout.node_separation);

                println!("\nOutput:");
                println!("  Format: {:?}", cfg.output.format);

                if let Some(user) = FlowConfig::user_config_path() {
                    println!("\nUser config: {}", user.display());
                }
            }
        }

        Commands::Init { output, user } => {
            let path = if user {
                FlowConfig::user_config_path()
                    .ok_or_else(|| anyhow::anyhow!("no per-user config directory on this platform"))?
            } else {
                output
            };
            FlowConfig::default().save(&path)?;
            println!("✅ Created config file: {}", path.display());
        }

        Commands::Validate { config } => match FlowConfig::load_from(config.as_deref()) {
            Ok(cfg) => {
                let problems = cfg.problems();
                if problems.is_empty() {
                    println!("✅ Configuration is valid");
                    println!("   Max depth: {}", cfg.compile.max_depth);
                    println!("   Fallback example: {}", cfg.loader.fallback_example);
                    println!("   Layout: {} ({})", cfg.layout.enabled, cfg.layout.direction);
                } else {
                    eprintln!("❌ Configuration problems:");
                    for problem in problems {
                        eprintln!("   - {}", problem);
                    }
                    std::process::exit(1);
                }
            }
            Err(e) => {
                eprintln!("❌ Configuration error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
