//! annolink CLI - instrument variable bindings and link them to CPG nodes

use annolink::config::{self, AnnolinkConfig};
use annolink::graph::GraphStore;
use annolink::linker::{annotation_report, LinkerConfig};
use annolink::pipeline::{self, LinkReport};
use annolink::storage::{import_json, SqliteGraph};
use annolink::ui::{self, Icons, Spinner};
use annolink::{Error, SourceAnnotator};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "annolink")]
#[command(version)]
#[command(about = "Annotate Rust variable bindings and link them to code property graph nodes")]
#[command(long_about = r#"
annolink instruments Rust source so every traceable `let` binding carries an
`annotate!` marker, then links the markers found in a lowered code property
graph back to the variable declarations they document.

Example usage:
  annolink annotate src/main.rs -o instrumented.rs
  annolink macro
  annolink import cpg.json
  annolink link
  annolink annotations
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Wrap variable bindings of a source file in marker calls
    Annotate {
        /// Source file to instrument
        input: PathBuf,

        /// Write the instrumented source here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// List wrapped and skipped bindings
        #[arg(long)]
        report: bool,
    },

    /// Write the marker macro definition the instrumented source includes
    Macro {
        /// Destination (defaults to the configured macro path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load a JSON graph export into the graph database
    Import {
        /// JSON file with `nodes` and `edges`
        graph: PathBuf,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Delete existing graph data first
        #[arg(long)]
        replace: bool,
    },

    /// Link annotation markers in the graph to their variables
    Link {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Scope created annotations to this submission key
        #[arg(short, long)]
        submission: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Annotate a source file, optionally import its lowered graph, and link
    Submit {
        /// Source file to instrument
        input: PathBuf,

        /// Where to write the instrumented source
        #[arg(short, long)]
        output: PathBuf,

        /// JSON graph export of the instrumented source
        #[arg(short, long)]
        graph: Option<PathBuf>,

        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Show statistics about the graph database
    Stats {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// List annotations and the variables they are linked to
    Annotations {
        /// Path to the database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Write a default annolink.toml
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout may carry instrumented source
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = config::load_config(cli.config.as_deref())?.unwrap_or_default();

    match cli.command {
        Commands::Annotate { input, output, report } => {
            let source = std::fs::read_to_string(&input)?;
            let annotator = SourceAnnotator::new(config.annotator.clone());
            let annotated = annotator.annotate_with_report(&source);

            if annotated.already_instrumented {
                ui::warn(&format!("{} is already instrumented, left unchanged", input.display()));
            }
            if report {
                for binding in &annotated.wrapped {
                    ui::wrapped_binding(binding);
                }
                for skipped in &annotated.skipped {
                    ui::skipped_binding(skipped);
                }
            }

            match output {
                Some(path) => {
                    std::fs::write(&path, &annotated.text)?;
                    ui::file_written(&path.display().to_string());
                    ui::summary_row("Bindings wrapped:", &annotated.wrapped.len().to_string());
                }
                None => print!("{}", annotated.text),
            }
        }

        Commands::Macro { output } => {
            let path = output.unwrap_or_else(|| PathBuf::from(&config.annotator.macro_path));
            annolink::annotator::write_marker_macro(&path, &config.annotator.macro_name)?;
            ui::file_written(&path.display().to_string());
        }

        Commands::Import { graph, database, replace } => {
            let database = resolve_database(database, &config);
            config::ensure_db_dir(&database)?;
            let mut store = SqliteGraph::open(&database)?;
            if replace {
                store.clear_all()?;
            }

            let spinner = Spinner::new(&format!("Importing {}", graph.display()));
            let stats = import_json(&mut store, &graph)?;
            spinner.finish_and_clear();

            ui::success(&format!("Imported {}", graph.display()));
            ui::summary_row("Nodes:", &stats.nodes.to_string());
            ui::summary_row("Edges:", &stats.edges.to_string());
            if stats.duplicate_edges > 0 {
                ui::summary_row("Duplicate edges skipped:", &stats.duplicate_edges.to_string());
            }
        }

        Commands::Link { database, submission, format } => {
            let database = resolve_database(database, &config);
            let mut linker = config.linker.clone();
            if let Some(submission) = submission {
                linker = linker.with_submission(submission);
            }

            let report = run_link(&database, &linker, matches!(format, Format::Text));
            if matches!(format, Format::Json) {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            exit_on_failure(&report);
        }

        Commands::Submit { input, output, graph, database } => {
            let database = resolve_database(database, &config);
            let source = std::fs::read_to_string(&input)?;
            let annotator = SourceAnnotator::new(config.annotator.clone());
            let submission = pipeline::prepare(&annotator, &source);

            std::fs::write(&output, submission.source())?;
            ui::header(&format!("Submission {}", submission.key));
            ui::file_written(&output.display().to_string());
            ui::summary_row("Bindings wrapped:", &submission.annotated.wrapped.len().to_string());

            if let Some(graph) = graph {
                config::ensure_db_dir(&database)?;
                let mut store = SqliteGraph::open(&database)?;
                let stats = import_json(&mut store, &graph)?;
                ui::summary_row("Graph nodes imported:", &stats.nodes.to_string());
            }

            let report = run_link(&database, &submission.linker_config(&config.linker), true);
            exit_on_failure(&report);
        }

        Commands::Stats { database } => {
            let database = resolve_database(database, &config);
            let store = open_existing(&database)?;
            let stats = store.stats()?;

            println!("{} annolink Statistics ({})", Icons::STATS, database.display());
            println!(
                "{}",
                ui::stats_table(&[
                    ("Nodes", stats.nodes.to_string()),
                    ("Edges", stats.edges.to_string()),
                    ("Variable declarations", stats.variables.to_string()),
                    ("Annotations", stats.annotations.to_string()),
                ])
            );
        }

        Commands::Annotations { database, format } => {
            let database = resolve_database(database, &config);
            let store = open_existing(&database)?;
            let annotations = annotation_report(&store)?;

            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&annotations)?),
                Format::Text if annotations.is_empty() => println!("∅ No annotations found."),
                Format::Text => {
                    for annotation in &annotations {
                        ui::annotation_line(annotation);
                    }
                    ui::section("Summary");
                    println!("{}", ui::annotations_table(&annotations));
                }
            }
        }

        Commands::Init { force } => {
            let path = cli.config.unwrap_or_else(config::default_config_path);
            let root = std::env::current_dir()?;
            let database = config::default_database_path_in(Path::new("."));
            let new_config = AnnolinkConfig {
                database: Some(database.display().to_string()),
                ..config
            };
            config::write_config(&path, &new_config, force)?;
            config::ensure_gitignore(&root)?;
            ui::success(&format!("Wrote {}", path.display()));
        }
    }

    Ok(())
}

/// CLI flag, then config file, then `.annolink/graph.db`
fn resolve_database(flag: Option<PathBuf>, config: &AnnolinkConfig) -> PathBuf {
    flag.or_else(|| config.database.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| config::default_database_path_in(Path::new(".")))
}

/// Open a database that must already exist
fn open_existing(path: &Path) -> annolink::Result<SqliteGraph> {
    if !path.exists() {
        return Err(Error::StoreUnavailable(format!(
            "no graph database at {}",
            path.display()
        )));
    }
    SqliteGraph::open(path)
}

fn run_link(database: &Path, linker: &LinkerConfig, show: bool) -> LinkReport {
    let started = Instant::now();
    let spinner = Spinner::new("Linking annotations");
    let report = pipeline::link_submission(|| open_existing(database), linker);
    spinner.finish_and_clear();

    if show {
        match &report {
            LinkReport::Linked(stats) => {
                ui::link_summary(started.elapsed(), stats);
                ui::info("Status", &report.message());
            }
            LinkReport::Unavailable { .. } => ui::warn(&report.message()),
            LinkReport::Failed { .. } => ui::error(&report.message()),
        }
    }
    report
}

fn exit_on_failure(report: &LinkReport) {
    if let LinkReport::Failed { .. } = report {
        std::process::exit(1);
    }
}
