use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use srcdex::index::build::{build_index, normalize, open_index, remove_files};
use srcdex::index::stats::{format_size, list_indexes, show_stats};
use srcdex::output;
use srcdex::utils::{self, find_source_root, AppConfig};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `SRCDEX_LOG=debug`
const LOG_ENV: &str = "SRCDEX_LOG";

#[derive(Parser)]
#[command(name = "srcdex")]
#[command(about = "Incremental identifier and include index for source trees")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Index or re-index a source tree
    Index {
        /// Path to index (auto-detects git root)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Discard the existing index first
        #[arg(short, long)]
        force: bool,

        /// No progress output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Files containing exactly this identifier
    Query {
        term: String,

        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
    /// Identifiers starting with a prefix
    Prefix {
        prefix: String,

        #[arg(short, long)]
        ignore_case: bool,

        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
    /// Identifiers matching a wildcard pattern (`*`, `?`, `[a-z]`)
    Pattern {
        pattern: String,

        #[arg(short, long)]
        ignore_case: bool,

        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
    /// Files that include the given name
    Includes {
        name: String,

        /// Treat the name as a prefix
        #[arg(long)]
        prefix: bool,

        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
    /// Files related to a file through include relationships
    Deps {
        /// File, relative to the root or absolute
        file: PathBuf,

        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
    /// Remove files from the index
    Remove {
        #[arg(required = true)]
        files: Vec<String>,

        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
    /// Show index statistics
    Stats {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// List all indexed source trees
    List,
    /// Delete the index of a source tree
    Drop {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let color = !cli.no_color;
    let config = AppConfig::load()?;

    match cli.command {
        Commands::Index { path, force, quiet } => {
            let root = find_source_root(&path)?;
            let report = build_index(&root, &config, force, quiet)?;
            if !quiet {
                println!(
                    "Indexed {} files ({} unchanged, {} removed, {} skipped)",
                    report.indexed, report.unchanged, report.removed, report.skipped
                );
                if let Some(merge) = &report.merge {
                    println!(
                        "Index: {} documents, {} terms, {} include entries, {}",
                        merge.documents,
                        merge.words,
                        merge.includes,
                        format_size(merge.bytes)
                    );
                }
                if report.errors > 0 {
                    eprintln!("({} files could not be read)", report.errors);
                }
                println!("Index stored at: {}", report.index_file.display());
            }
        }
        Commands::Query { term, path } => {
            let index = open_index(&find_source_root(&path)?, &config)?;
            output::print_hits(&index.query(&term)?, color)?;
        }
        Commands::Prefix {
            prefix,
            ignore_case,
            path,
        } => {
            let index = open_index(&find_source_root(&path)?, &config)?;
            output::print_entries(&index.query_prefix(&prefix, !ignore_case)?, color)?;
        }
        Commands::Pattern {
            pattern,
            ignore_case,
            path,
        } => {
            let index = open_index(&find_source_root(&path)?, &config)?;
            output::print_entries(&index.query_pattern(&pattern, !ignore_case)?, color)?;
        }
        Commands::Includes { name, prefix, path } => {
            let index = open_index(&find_source_root(&path)?, &config)?;
            let entries = if prefix {
                index.query_include_prefix(&name)?
            } else {
                index.query_includes(&name)?
            };
            output::print_entries(&entries, color)?;
        }
        Commands::Deps { file, path } => {
            let root = find_source_root(&path)?;
            let index = open_index(&root, &config)?;
            let rel = relative_to(&root, &file)?;
            output::print_paths(&index.file_dependencies(&rel)?, color)?;
        }
        Commands::Remove { files, path } => {
            let root = find_source_root(&path)?;
            let removed = remove_files(&root, &config, &files)?;
            println!("Removed {} of {} files from the index", removed, files.len());
        }
        Commands::Stats { path } => {
            show_stats(&path, &config)?;
        }
        Commands::List => {
            list_indexes()?;
        }
        Commands::Drop { path } => {
            let root = find_source_root(&path)?;
            if utils::remove_index(&root)? {
                println!("Removed index for: {}", root.display());
            } else {
                println!("No index for: {}", root.display());
            }
        }
    }

    Ok(())
}

/// Index key for `file`: absolute paths are made relative to `root`
fn relative_to(root: &Path, file: &Path) -> Result<String> {
    let rel = if file.is_absolute() {
        let canonical = file
            .canonicalize()
            .with_context(|| format!("Invalid path: {}", file.display()))?;
        canonical
            .strip_prefix(root)
            .with_context(|| format!("{} is outside {}", file.display(), root.display()))?
            .to_path_buf()
    } else {
        file.to_path_buf()
    };

    Ok(normalize(&rel))
}
