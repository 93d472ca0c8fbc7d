use std::path::PathBuf;

use clap::{Parser, Subcommand};
use codetrace::{
    config::Settings, logging, retrieve::OutputShape, search::LexicalIndex, storage::IndexPersistence,
    ContextRetriever,
};

#[derive(Parser)]
#[command(name = "codetrace")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Local, privacy-preserving code intelligence over a source tree")]
struct Cli {
    /// Project root to operate on
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        #[arg(short, long)]
        force: bool,
    },

    /// Parse the project and save the index, reusing a prior run when possible
    Index {
        /// Ignore any existing saved index and rebuild from scratch
        #[arg(short, long)]
        force: bool,
    },

    /// Print the resolved configuration
    Config,

    /// Fetch a unique identifier and its transitive context
    Retrieve {
        /// Unique identifiers to fetch, e.g. `pkg.module.ClassName.method_name`
        ids: Vec<String>,

        /// How many hops of references to follow
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Run a lexical query against the saved index
    Search {
        query: String,

        #[arg(short, long, default_value_t = 10)]
        top_k: usize,

        /// Skip query-variation fan-out and run a plain BM25 query
        #[arg(long)]
        exact_only: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("configuration error: {e}, falling back to defaults");
        Settings::default()
    });
    logging::init_with_config(&settings.logging);

    let result = match cli.command {
        Commands::Init { force } => run_init(&settings, force),
        Commands::Config => run_config(&settings),
        Commands::Index { force } => run_index(&cli.root, &settings, force).await,
        Commands::Retrieve { ids, depth } => run_retrieve(&cli.root, &settings, ids, depth).await,
        Commands::Search { query, top_k, exact_only } => run_search(&cli.root, &settings, &query, top_k, exact_only).await,
    };

    if let Err(message) = result {
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}

fn persistence_for(root: &std::path::Path, settings: &Settings) -> IndexPersistence {
    IndexPersistence::new(root.join(&settings.storage.storage_dir))
}

fn run_init(settings: &Settings, force: bool) -> Result<(), String> {
    let path = PathBuf::from(".codetrace/settings.toml");
    if path.exists() && !force {
        return Err(format!("{} already exists; pass --force to overwrite", path.display()));
    }
    settings.save(&path).map_err(|e| e.to_string())?;
    println!("wrote configuration to {}", path.display());
    Ok(())
}

fn run_config(settings: &Settings) -> Result<(), String> {
    let rendered = toml::to_string_pretty(settings).map_err(|e| e.to_string())?;
    println!("{rendered}");
    Ok(())
}

async fn run_index(root: &std::path::Path, settings: &Settings, force: bool) -> Result<(), String> {
    let persistence = persistence_for(root, settings);
    if force {
        persistence.clear().map_err(|e| e.to_string())?;
    }
    let codebase = codetrace::storage::check_for_updates(root, settings, &persistence)
        .await
        .map_err(|e| e.to_string())?;
    println!("indexed {} file(s), {} element id(s) cached", codebase.root.len(), codebase.cached_ids().len());
    Ok(())
}

async fn run_retrieve(root: &std::path::Path, settings: &Settings, ids: Vec<String>, depth: Option<usize>) -> Result<(), String> {
    let persistence = persistence_for(root, settings);
    let codebase = load_or_index(root, settings, &persistence).await?;

    let retriever = ContextRetriever::new(&codebase);
    let depth = depth.unwrap_or(settings.context.default_depth);
    let context = retriever
        .get(&ids, depth, settings.context.max_depth, OutputShape::AsString)
        .map_err(|e| e.to_string())?;
    println!("{}", context.joined());
    Ok(())
}

async fn run_search(root: &std::path::Path, settings: &Settings, query: &str, top_k: usize, exact_only: bool) -> Result<(), String> {
    let persistence = persistence_for(root, settings);
    let codebase = load_or_index(root, settings, &persistence).await?;

    let mut index = LexicalIndex::new(&settings.search);
    let documents = codebase.root.iter().map(|f| (f.file_path.clone(), f.raw.clone())).collect();
    index.build(documents).await.map_err(|e| e.to_string())?;

    let results = if exact_only {
        index.query(query, top_k).await.map_err(|e| e.to_string())?
    } else {
        index.smart_search(query, top_k, settings.search.exact_match_boost).await.map_err(|e| e.to_string())?
    };

    for (path, score) in results {
        println!("{score:>8.4}  {path}");
    }
    Ok(())
}

async fn load_or_index(root: &std::path::Path, settings: &Settings, persistence: &IndexPersistence) -> Result<codetrace::model::CodeBase, String> {
    codetrace::storage::check_for_updates(root, settings, persistence).await.map_err(|e| e.to_string())
}
