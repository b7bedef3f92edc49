//! docweave CLI tool
//!
//! Command-line interface for registering a documentation bundle directory with docweave-core.
//!
//! ## Commands
//!
//! - `build <dir>`: Register the bundle once, then print diagnostics and a curation summary
//!
//! ## Bundle layout
//!
//! Every `*.symbols.json` file below the directory is a symbol graph, every `*.md` and
//! `*.tutorial` file a document. All other files are registered as resources under their path
//! relative to the directory. Hidden files and directories are skipped.

use clap::{Parser, Subcommand};
use docweave_core::{
    config::{default_config_path, ContextConfiguration},
    context::{BundleInputs, CancellationFlag, DocumentationContext, RegistrationOutcome},
    diagnostic::{Diagnostic, Severity},
    document::{DocumentSource, Resource},
    properties::{permitted_root_kinds, ResolvedIdentifier},
    symbolgraph::SymbolGraph,
    topicgraph::CurationOrigin,
    DocweaveError,
};
use serde::Serialize;
use std::{
    collections::BTreeSet,
    fs::{read, read_to_string},
    path::{Path, PathBuf},
};
use walkdir::{DirEntry, WalkDir};

#[derive(Parser)]
#[command(name = "docweave")]
#[command(author, version, about = "A tool for registering documentation bundles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a bundle directory and display diagnostics
    Build {
        /// Path to the bundle directory
        path: PathBuf,

        /// Configuration file path (default: <path>/docweave.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Serialize)]
struct CurationEntry {
    depth: usize,
    title: String,
    path: Option<String>,
    automatic: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    outcome: RegistrationOutcome,
    pages: usize,
    curation_edges: usize,
    curation: Vec<CurationEntry>,
    diagnostics: &'a [Diagnostic],
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            path,
            config,
            json,
            verbose,
        } => {
            let config_path = config.unwrap_or_else(|| default_config_path(&path));
            let configuration = ContextConfiguration::load(&config_path)?;
            if verbose {
                eprintln!("Bundle: {}", path.display());
                eprintln!("Config: {}", config_path.display());
            }

            let inputs = discover_inputs(&path)?;
            if verbose {
                eprintln!(
                    "Found {} symbol graphs, {} documents, {} resources",
                    inputs.symbol_graphs.len(),
                    inputs.documents.len(),
                    inputs.resources.len()
                );
            }

            let cancel = CancellationFlag::new();
            let handle = cancel.clone();
            ctrlc::set_handler(move || {
                eprintln!("\nCancelling...");
                handle.cancel();
            })?;

            let mut context = DocumentationContext::new(configuration);
            let outcome = context.register(inputs, &cancel)?;
            let report = Report {
                outcome,
                pages: context.documentation_cache().len(),
                curation_edges: context.topic_graph().edge_count(),
                curation: curation_summary(&context),
                diagnostics: context.diagnostics(),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }

            let errors = context
                .diagnostics()
                .iter()
                .filter(|diagnostic| diagnostic.severity() == Severity::Error)
                .count();
            if outcome.is_cancelled() || errors > 0 {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

fn discover_inputs(root: &Path) -> Result<BundleInputs, DocweaveError> {
    if !root.is_dir() {
        return Err(DocweaveError::NotFound(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    let mut files = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_hidden(e) || e.path() == root)
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect::<Vec<_>>();
    files.sort();

    let mut inputs = BundleInputs::new();
    for file in files {
        let relative = file
            .strip_prefix(root)
            .unwrap_or(&file)
            .to_string_lossy()
            .replace('\\', "/");
        if relative == "docweave.toml" {
            continue;
        }
        if relative.ends_with(".symbols.json") {
            let graph = SymbolGraph::from_json(&read_to_string(&file)?)?;
            inputs.symbol_graphs.push(graph);
        } else if relative.ends_with(".md") || relative.ends_with(".tutorial") {
            inputs
                .documents
                .push(DocumentSource::new(relative, read_to_string(&file)?));
        } else {
            inputs.resources.push(Resource {
                name: relative,
                data: read(&file)?,
            });
        }
    }
    Ok(inputs)
}

/// Depth-first listing of the topic graph below every root page.
fn curation_summary(context: &DocumentationContext) -> Vec<CurationEntry> {
    let graph = context.topic_graph();
    let permitted = permitted_root_kinds();
    let mut entries = Vec::new();
    for root in graph.roots() {
        let Some(node) = graph.node(&root) else {
            continue;
        };
        if !permitted.contains(node.kind) {
            continue;
        }
        let mut stack: Vec<(ResolvedIdentifier, usize, bool)> = vec![(root, 0, false)];
        let mut seen = BTreeSet::new();
        while let Some((reference, depth, automatic)) = stack.pop() {
            if !seen.insert(reference) {
                continue;
            }
            let Some(node) = graph.node(&reference) else {
                continue;
            };
            entries.push(CurationEntry {
                depth,
                title: node.title.clone(),
                path: context.absolute_path(reference),
                automatic,
            });
            for child in graph.edges(reference).into_iter().rev() {
                let automatic =
                    graph.edge_origin(reference, child) == Some(CurationOrigin::Automatic);
                stack.push((child, depth + 1, automatic));
            }
        }
    }
    entries
}

fn print_report(report: &Report<'_>) {
    match report.outcome {
        RegistrationOutcome::Completed => println!("\n=== Registration complete ==="),
        RegistrationOutcome::Cancelled { phase } => {
            println!("\n=== Registration cancelled before {phase} ===")
        }
    }
    println!("Pages: {}", report.pages);
    println!("Curation edges: {}", report.curation_edges);

    if !report.curation.is_empty() {
        println!("\n=== Curation ===");
        for entry in report.curation.iter() {
            let marker = if entry.automatic { " (auto)" } else { "" };
            println!(
                "{}{}{} {}",
                "  ".repeat(entry.depth),
                entry.title,
                marker,
                entry.path.as_deref().unwrap_or("")
            );
        }
    }

    if !report.diagnostics.is_empty() {
        println!("\n=== Diagnostics ===");
        for diagnostic in report.diagnostics {
            let label = match diagnostic.severity() {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Info => "info",
            };
            println!("{label}: {diagnostic}");
        }
    }
}
