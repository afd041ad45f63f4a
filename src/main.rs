//! CLI entry point for candimatch.
//!
//! Provides commands for building the candidate index from embeddings or
//! catalog text, checking the artifact pair, and running similarity
//! searches against it.

use anyhow::{Context, Result, anyhow};
use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Level;

use candimatch::display::{
    THEME, create_build_table, create_hits_table, create_progress_bar, create_snapshot_table,
};
use candimatch::io::ExitCode;
use candimatch::vector::parse_embedding_model;
use candimatch::{
    CandidateCatalog, CandidateId, EmbeddingGenerator, FastEmbedGenerator, MatchError,
    MatchService, RawEmbeddings, SearchHit, Settings,
};

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Semantic candidate matching
#[derive(Parser)]
#[command(
    name = "candimatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Semantic candidate matching",
    long_about = "Embed candidate profiles, build a flat similarity index, and rank candidates against requirement text.",
    next_line_help = true,
    styles = clap_cargo_style()
)]
struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
enum Commands {
    /// Initialize project
    #[command(about = "Set up .candimatch directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings from .candimatch/settings.toml")]
    Config,

    /// Build the index from a raw embeddings artifact
    #[command(
        about = "Build the index from precomputed embeddings",
        after_help = "Examples:\n  candimatch build\n  candimatch build --embeddings data/candidate_embeddings.bin --index data/candidates.index"
    )]
    Build {
        /// Raw embeddings artifact (overrides config)
        #[arg(long)]
        embeddings: Option<PathBuf>,

        /// Index artifact to write (overrides config)
        #[arg(long)]
        index: Option<PathBuf>,
    },

    /// Embed the catalog and build the index
    #[command(
        about = "Embed every candidate profile and rebuild all artifacts",
        after_help = "Examples:\n  candimatch precompute\n  candimatch precompute --catalog exports/candidates.json"
    )]
    Precompute {
        /// Catalog to embed (overrides config)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Load the artifact pair and report on it
    #[command(about = "Verify that the index and catalog load together")]
    Check,

    /// Embed text and print the unit-length vector
    #[command(about = "Embed text with the configured model")]
    Embed {
        text: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Rank candidates against requirement text
    #[command(
        about = "Find the candidates most similar to requirement text",
        after_help = "Examples:\n  candimatch search \"senior backend engineer\"\n  candimatch search \"data analyst\" -k 5 --filter c1 --filter c7\n  candimatch search \"designer\" --json | jq '.[].candidate_id'"
    )]
    Search {
        /// Requirement text
        text: String,

        /// Maximum number of results (defaults to search.default_top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Only return these candidate ids (repeatable)
        #[arg(long = "filter")]
        filter: Vec<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Rank candidates against a catalogued candidate
    #[command(
        about = "Find the candidates most similar to an existing candidate",
        after_help = "Examples:\n  candimatch similar c3\n  candimatch similar c3 -k 3 --json"
    )]
    Similar {
        /// Candidate id to use as the query
        id: String,

        /// Maximum number of results (defaults to search.default_top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Only return these candidate ids (repeatable)
        #[arg(long = "filter")]
        filter: Vec<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct EmbedOutput<'a> {
    model: &'a str,
    embedding: Vec<f32>,
}

fn main() {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Settings::load_from(path).unwrap_or_else(|e| {
            eprintln!(
                "{}",
                THEME.error_with_icon(&format!(
                    "Configuration error loading from {}: {e}",
                    path.display()
                ))
            );
            std::process::exit(ExitCode::ConfigError.into());
        }),
        None => Settings::load().unwrap_or_else(|e| {
            eprintln!("{}", THEME.warning_with_icon(&format!("Configuration error: {e}")));
            eprintln!("Using default configuration.");
            Settings::default()
        }),
    };
    if cli.debug {
        config.debug = true;
    }

    init_tracing(config.debug);

    let code = match run(cli.command, config) {
        Ok(code) => code,
        Err(e) => report_error(&e),
    };
    std::process::exit(code.into());
}

fn init_tracing(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Prints an error with recovery hints and picks the exit code.
fn report_error(error: &anyhow::Error) -> ExitCode {
    eprintln!("{}", THEME.error_with_icon(&format!("{error:#}")));

    match error.downcast_ref::<MatchError>() {
        Some(match_error) => {
            for hint in match_error.recovery_suggestions() {
                eprintln!("  {}", THEME.apply(&THEME.dim, hint));
            }
            ExitCode::from_error(match_error)
        }
        None => ExitCode::GeneralError,
    }
}

fn run(command: Commands, mut config: Settings) -> Result<ExitCode> {
    match command {
        Commands::Init { force } => {
            let path = Settings::init_config_file(force).map_err(|e| anyhow!("{e}"))?;
            println!(
                "{}",
                THEME.success_with_icon(&format!(
                    "Created configuration file at: {}",
                    path.display()
                ))
            );
            println!("Edit this file to customize your settings.");
            Ok(ExitCode::Success)
        }

        Commands::Config => {
            println!("{}", THEME.apply(&THEME.header, "Current Configuration:"));
            println!("{}", "=".repeat(50));
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(ExitCode::Success)
        }

        Commands::Build { embeddings, index } => {
            if let Some(path) = embeddings {
                config.artifacts.embeddings = from_cwd(&path)?;
            }
            if let Some(path) = index {
                config.artifacts.index = from_cwd(&path)?;
            }
            config.validate()?;

            let raw = RawEmbeddings::open(&config.embeddings_path())?;
            let report = MatchService::new(&config).build_or_update(raw)?;

            println!("{}", create_build_table(&report));
            warn_degenerate(report.degenerate_rows.len());
            Ok(ExitCode::Success)
        }

        Commands::Precompute { catalog } => {
            if let Some(path) = catalog {
                config.artifacts.catalog = from_cwd(&path)?;
            }
            config.validate()?;

            let catalog = CandidateCatalog::load(&config.catalog_path())?;
            let service = MatchService::new(&config).with_embedder(create_embedder(&config)?);

            let pb = create_progress_bar(catalog.len() as u64, "embedding profiles");
            let report = service.precompute(catalog, |done| pb.set_position(done as u64));
            pb.finish_and_clear();
            let report = report?;

            println!("{}", create_build_table(&report));
            warn_degenerate(report.degenerate_rows.len());
            Ok(ExitCode::Success)
        }

        Commands::Check => {
            let service = MatchService::new(&config);
            service.reload()?;
            let snapshot = service.active().require()?;

            println!("{}", create_snapshot_table(&snapshot));
            if let Some(model) = snapshot.manifest().and_then(|m| m.model_name.as_deref()) {
                if model != config.embedding.model {
                    println!(
                        "{}",
                        THEME.warning_with_icon(&format!(
                            "index was built with {model} but embedding.model is {}",
                            config.embedding.model
                        ))
                    );
                }
            }
            println!(
                "{}",
                THEME.success_with_icon("index and catalog are in sync")
            );
            Ok(ExitCode::Success)
        }

        Commands::Embed { text, json } => {
            config.validate()?;
            let embedder = create_embedder(&config)?;
            let model = embedder.model_name().to_string();
            let service = MatchService::new(&config).with_embedder(embedder);

            let embedding = service.embed(&text)?;
            if json {
                let output = EmbedOutput {
                    model: &model,
                    embedding,
                };
                println!("{}", serde_json::to_string(&output)?);
            } else {
                println!("{model} ({} dimensions)", embedding.len());
                let preview: Vec<String> =
                    embedding.iter().take(8).map(|x| format!("{x:.4}")).collect();
                println!("[{}, ...]", preview.join(", "));
            }
            Ok(ExitCode::Success)
        }

        Commands::Search {
            text,
            top_k,
            filter,
            json,
        } => {
            config.validate()?;
            let service = MatchService::new(&config).with_embedder(create_embedder(&config)?);
            service.reload()?;

            let filter = filter_set(filter);
            let hits = service.search_text(&text, top_k, filter.as_ref())?;
            print_hits(&service, &hits, json)
        }

        Commands::Similar {
            id,
            top_k,
            filter,
            json,
        } => {
            let service = MatchService::new(&config);
            service.reload()?;

            let filter = filter_set(filter);
            let hits = service.similar(&id, top_k, filter.as_ref())?;
            print_hits(&service, &hits, json)
        }
    }
}

fn create_embedder(config: &Settings) -> Result<Arc<FastEmbedGenerator>> {
    let model = parse_embedding_model(&config.embedding.model)?;
    let generator = FastEmbedGenerator::new(
        model,
        config.embedding.cache_dir.clone(),
        config.embedding.show_download_progress,
    )
    .with_context(|| format!("loading embedding model {}", config.embedding.model))?;
    Ok(Arc::new(generator))
}

fn from_cwd(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn filter_set(ids: Vec<String>) -> Option<HashSet<CandidateId>> {
    (!ids.is_empty()).then(|| ids.into_iter().map(CandidateId::from).collect())
}

fn print_hits(service: &MatchService, hits: &[SearchHit], json: bool) -> Result<ExitCode> {
    if json {
        println!("{}", serde_json::to_string_pretty(hits)?);
    } else if hits.is_empty() {
        println!("{}", THEME.warning_with_icon("no matching candidates"));
    } else {
        let snapshot = service.active().require()?;
        println!("{}", create_hits_table(hits, snapshot.catalog()));
    }
    Ok(ExitCode::from_hit_count(hits.len()))
}

fn warn_degenerate(count: usize) {
    if count > 0 {
        println!(
            "{}",
            THEME.warning_with_icon(&format!(
                "{count} profiles embedded to a zero vector and will never match"
            ))
        );
    }
}
