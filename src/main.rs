use std::path::Path;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use braid::{
    cli::{Cli, Command},
    config::RetrievalConfig,
    data_dir::DataDir,
    embedder::HashEmbedder,
    error,
    feedback,
    fusion,
    ingestion,
    reranker::NoopReranker,
    tantivy_index::LexicalIndex,
    vector_db::VectorDb,
    walker,
};

fn init_tracing(verbose: u8) {
    let filter = if let Ok(env) = std::env::var("BRAID_LOG") {
        EnvFilter::new(env)
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn load_config(
    explicit: Option<&Path>,
    data_dir: &DataDir,
) -> error::Result<RetrievalConfig> {
    if let Some(path) = explicit {
        return RetrievalConfig::from_file(path);
    }
    let default_path = data_dir.config_file();
    if default_path.exists() {
        return RetrievalConfig::from_file(&default_path);
    }
    Ok(RetrievalConfig::default())
}

fn open_stores(
    data_dir: &DataDir,
) -> error::Result<(VectorDb, LexicalIndex)> {
    let dense = VectorDb::open(
        &data_dir.vectors_db(),
        Box::new(HashEmbedder::default()),
    )?;
    let sparse = LexicalIndex::open(&data_dir.tantivy_dir()?)?;
    Ok((dense, sparse))
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let cfg = load_config(cli.config.as_deref(), &data_dir)?;

    match cli.command {
        Command::Index(args) => {
            let (dense, sparse) = open_stores(&data_dir)?;
            let files = walker::discover_files(&args.path)?;
            let total =
                ingestion::ingest_files(&files, &cfg, &dense, &sparse)?;
            println!(
                "Indexed {total} chunk(s) from {} file(s)",
                files.len()
            );
        }
        Command::Search(args) => {
            let (dense, sparse) = open_stores(&data_dir)?;
            let mut results = fusion::hybrid_search(
                &args.query,
                &cfg,
                &dense,
                &sparse,
                &NoopReranker,
            )?;
            if let Some(count) = args.count {
                results.truncate(count);
            }

            if args.json {
                println!("{}", fusion::format_json(&args.query, &results)?);
            } else {
                fusion::format_human(&results);
            }
        }
        Command::Feedback(args) => {
            let (dense, sparse) = open_stores(&data_dir)?;
            feedback::append_exchange(
                &args.id,
                &args.question,
                &args.answer,
                &cfg,
                &dense,
                &sparse,
            )?;
            println!("Recorded exchange '{}'", args.id);
        }
        Command::Status(args) => {
            let (dense, sparse) = open_stores(&data_dir)?;
            let dense_entries = dense.len()?;
            let sparse_entries = sparse.len()?;

            if args.json {
                let status = serde_json::json!({
                    "data_dir": data_dir.root().display().to_string(),
                    "dense_entries": dense_entries,
                    "sparse_entries": sparse_entries,
                });
                println!("{status}");
            } else {
                println!("data dir: {}", data_dir.root().display());
                println!("dense entries: {dense_entries}");
                println!("sparse entries: {sparse_entries}");
            }
        }
        Command::Completions(args) => args.generate(),
    }

    Ok(())
}
