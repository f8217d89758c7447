//! Matches observed peaks against crosslinked combinations of digested peptides

mod config;
mod report;

// Standard Library Imports
use std::{
    fs,
    path::{Path, PathBuf},
};

// External Crate Imports
use ambiguity::{AmbiguityString, VariantEnumerator};
use clap::{Parser, Subcommand};
use crosslinks::{FragmentPool, combination_shapes, delimited_shapes, search};
use formula::AtomicDatabase;
use miette::{IntoDiagnostic, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// Local Crate Imports
use config::Job;
use report::SearchReport;

#[derive(Parser, Debug)]
#[command(name = "linkfinder", version, about)]
struct Cli {
    /// Log filter, like `info` or `crosslinks=debug`
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the search described by a KDL job file
    Search {
        job: PathBuf,
        /// Write the report here instead of to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List every unambiguous variant of a modified peptide
    Variants {
        sequence: String,
        /// A modification string, like `Phospho@3|5;Oxidation@1`
        modifications: String,
    },
    /// List the combination shapes searched for a bridge
    Shapes {
        max_molecules: usize,
        max_link_aa: usize,
        /// Only the shapes used when the first fragment is fixed by a filter
        #[arg(long)]
        delimited: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Search { job, output } => run_search(&job, output.as_deref()),
        Commands::Variants {
            sequence,
            modifications,
        } => list_variants(&sequence, &modifications),
        Commands::Shapes {
            max_molecules,
            max_link_aa,
            delimited,
        } => {
            let shapes = if delimited {
                delimited_shapes(max_molecules, max_link_aa)
            } else {
                combination_shapes(max_molecules, max_link_aa)
            };
            for shape in shapes {
                println!("{shape}");
            }
            Ok(())
        }
    }
}

fn run_search(job_path: &Path, output: Option<&Path>) -> Result<()> {
    let db = AtomicDatabase::default();
    let kdl = fs::read_to_string(job_path).into_diagnostic()?;
    let job = Job::from_kdl(&db, job_path.to_string_lossy(), kdl)?;

    let pool = FragmentPool::build(
        job.fragments,
        job.settings.bridge(),
        &db,
        job.mass_type,
        job.max_fragment_mass,
    );
    let result = search(&pool, &job.peaks, &job.settings);
    let report = SearchReport::new(&result, &job.peaks, &job.settings, &job.site_targets);
    info!(sites = report.site_scores().len(), "scored modification sites");
    let report = report.to_string();

    if let Some(path) = output {
        fs::write(path, report).into_diagnostic()?;
        info!(path = %path.display(), "wrote search report");
    } else {
        print!("{report}");
    }
    Ok(())
}

fn list_variants(sequence: &str, modifications: &str) -> Result<()> {
    let modifications = AmbiguityString::new(modifications).map_err(|e| *e)?;
    let variants = VariantEnumerator::new(sequence, &modifications).map_err(|e| *e)?;
    info!(total = variants.total(), "enumerating variants");
    for variant in variants {
        println!("{variant}");
    }
    Ok(())
}
