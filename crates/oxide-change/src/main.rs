//! oxide-change CLI
//!
//! Command-line tool for inspecting changeset files.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_change::dialect::{self, BUILTIN_DIALECTS};
use oxide_change::prelude::*;

/// Dialect-aware, reversible schema change units.
#[derive(Parser)]
#[command(name = "oxide-change")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Target dialect (postgresql, sqlite, mysql).
    #[arg(short, long, env = "OXIDE_CHANGE_DIALECT", default_value = "postgresql")]
    dialect: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered change kinds.
    Kinds,

    /// Print the SQL of a changeset file.
    Sql {
        /// Changeset file (JSON).
        file: PathBuf,

        /// Print rollback SQL instead of forward SQL.
        #[arg(short, long)]
        rollback: bool,
    },

    /// Validate a changeset file against several dialects.
    Validate {
        /// Changeset file (JSON).
        file: PathBuf,

        /// Dialects to validate against (the selected dialect if not
        /// specified).
        #[arg(short, long)]
        target: Vec<String>,
    },

    /// Print the fingerprints of a changeset file.
    Fingerprint {
        /// Changeset file (JSON).
        file: PathBuf,
    },

    /// Print the database objects a changeset file touches.
    Objects {
        /// Changeset file (JSON).
        file: PathBuf,
    },
}

fn dialect_named(name: &str) -> anyhow::Result<Box<dyn Dialect>> {
    match dialect::by_name(name) {
        Some(dialect) => Ok(dialect),
        None => bail!(
            "Unknown dialect '{name}' (expected one of: {})",
            BUILTIN_DIALECTS.join(", ")
        ),
    }
}

fn load(file: &Path, dialect: &dyn Dialect) -> anyhow::Result<ChangeSet> {
    let document = ChangeSetDocument::load(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let base = std::env::current_dir()?;
    let resources = FsResourceResolver::new(base).with_origin(file);
    let origin = file.display().to_string();
    Ok(document.build(ChangeRegistry::global(), dialect, &origin, &resources)?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let dialect = dialect_named(&cli.dialect)?;
    let dialect = dialect.as_ref();

    match cli.command {
        Commands::Kinds => {
            for descriptor in ChangeRegistry::global().descriptors() {
                let targets = descriptor
                    .dialects
                    .map_or_else(|| "any".to_string(), |names| names.join(","));
                println!(
                    "{:<30} {:>2}  {:<12} {}",
                    descriptor.metadata.kind,
                    descriptor.metadata.specialization_level,
                    targets,
                    descriptor.metadata.description
                );
            }
        }

        Commands::Sql { file, rollback } => {
            let changeset = load(&file, dialect)?;
            let errors = changeset.validate(&[dialect]);
            if let Some(error) = errors.into_iter().next() {
                return Err(error.into());
            }
            let statements = if rollback {
                changeset.generate_rollback_statements(dialect)?
            } else {
                changeset.generate_statements(dialect)?
            };
            for statement in &statements {
                println!("{statement};");
            }
        }

        Commands::Validate { file, target } => {
            let changeset = load(&file, dialect)?;
            let targets = if target.is_empty() {
                vec![cli.dialect.clone()]
            } else {
                target
            };
            let targets = targets
                .iter()
                .map(|name| dialect_named(name))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let targets: Vec<&dyn Dialect> = targets.iter().map(AsRef::as_ref).collect();

            let errors = changeset.validate(&targets);
            for error in &errors {
                println!("{error}");
            }
            if !errors.is_empty() {
                bail!("{} validation error(s) in {}", errors.len(), file.display());
            }
            info!(changes = changeset.len(), "Changeset is valid");
        }

        Commands::Fingerprint { file } => {
            let changeset = load(&file, dialect)?;
            for unit in changeset.units() {
                println!("{}  {}", unit.fingerprint(), unit.kind());
            }
            println!("{}  {}", changeset.fingerprint(), changeset.reference());
        }

        Commands::Objects { file } => {
            let changeset = load(&file, dialect)?;
            for object in changeset.affected_objects(dialect) {
                println!("{object}");
            }
        }
    }

    Ok(())
}
