//! Schema Flow CLI
//!
//! Compiles a schema document (or a bundled example) into a node/edge graph
//! and writes it as JSON or DOT.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use schema_flow::config::OutputFormat;
use schema_flow::graph::{Direction, LayoutEngine};
use schema_flow::loader::{self, LoadOutcome};
use schema_flow::{compile_dictionary, compile_root, FlowConfig, FlowDocument, SchemaDictionary};

#[derive(Parser)]
#[command(name = "schema-flow")]
#[command(about = "Compile schema dictionaries into node/edge graphs")]
struct Cli {
    /// Config file to load (optional)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile to a JSON flow document
    Compile {
        /// Schema document or directory (defaults to loader.schema_path)
        schema: Option<PathBuf>,

        /// Compile only this registered object and what it references
        #[arg(long)]
        root: Option<String>,

        /// Bundled example to use when no schema loads
        #[arg(short, long)]
        example: Option<String>,

        /// Leave nodes without positions
        #[arg(long)]
        no_layout: bool,

        /// Layout direction: TB or LR
        #[arg(long)]
        direction: Option<Direction>,

        /// Single-line JSON
        #[arg(long)]
        compact: bool,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export GraphViz DOT
    Dot {
        schema: Option<PathBuf>,

        #[arg(short, long)]
        example: Option<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fuzzy search node ids and labels
    Search {
        query: String,

        schema: Option<PathBuf>,

        #[arg(short, long)]
        example: Option<String>,

        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// List bundled examples
    Examples,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = FlowConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Compile {
            schema,
            root,
            example,
            no_layout,
            direction,
            compact,
            output,
        } => {
            let (dict, outcome) = load(&cfg, schema, example)?;
            let graph = match &root {
                Some(name) => {
                    let root_schema = dict
                        .get(name)
                        .ok_or_else(|| anyhow!("no schema named '{}' in {}", name, outcome.source))?;
                    compile_root(&dict, root_schema, cfg.compile_options())?
                }
                None => compile_dictionary(&dict, cfg.compile_options())?,
            };
            let fingerprint = graph.fingerprint()?;
            info!(
                nodes = graph.node_count(),
                edges = graph.edge_count(),
                %fingerprint,
                "compiled graph"
            );

            let compact = compact || cfg.output.format == OutputFormat::Compact;
            let rendered = if cfg.layout.enabled && !no_layout {
                let mut layout = cfg.layered_layout();
                if let Some(direction) = direction {
                    layout.direction = direction;
                }
                to_json(&document(layout.layout(&graph), &outcome, root), compact)?
            } else {
                to_json(&document(graph, &outcome, root), compact)?
            };
            emit(&rendered, output.as_deref())?;
        }

        Commands::Dot {
            schema,
            example,
            output,
        } => {
            let (dict, _) = load(&cfg, schema, example)?;
            let graph = compile_dictionary(&dict, cfg.compile_options())?;
            emit(&graph.to_dot(), output.as_deref())?;
        }

        Commands::Search {
            query,
            schema,
            example,
            limit,
        } => {
            let (dict, _) = load(&cfg, schema, example)?;
            let graph = compile_dictionary(&dict, cfg.compile_options())?;
            let hits = graph.search(&query, limit);
            if hits.is_empty() {
                println!("No nodes match '{}'", query);
            }
            for hit in hits {
                println!("{:>5}  {:<32} {:?}  ({})", hit.score, hit.id, hit.kind, hit.label);
            }
        }

        Commands::Examples => {
            for name in loader::bundled_names() {
                let dict = loader::load_bundled(name)?;
                println!("{:<12} {} schemas", name, dict.len());
            }
        }
    }

    Ok(())
}

/// Load the requested document, falling back to a bundled example
fn load(
    cfg: &FlowConfig,
    schema: Option<PathBuf>,
    example: Option<String>,
) -> anyhow::Result<(SchemaDictionary, LoadOutcome)> {
    let path = schema.or_else(|| cfg.loader.schema_path.clone());
    let example = example.unwrap_or_else(|| cfg.loader.fallback_example.clone());
    let (dict, outcome) = loader::load_or_fallback(path.as_deref(), &example)?;

    if let Some(error) = &outcome.error {
        eprintln!("⚠️  Could not load schemas, showing bundled example '{}'", example);
        eprintln!("   {}", error);
    }
    Ok((dict, outcome))
}

fn document<G: Serialize>(graph: G, outcome: &LoadOutcome, root: Option<String>) -> FlowDocument<G> {
    FlowDocument {
        graph,
        fallback: outcome.fallback,
        error: outcome.error.clone(),
        schema: root,
    }
}

fn to_json<T: Serialize>(value: &T, compact: bool) -> anyhow::Result<String> {
    let text = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    Ok(text)
}

fn emit(content: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("✅ Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

