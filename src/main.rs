use clap::Parser;
use relgraph::{config, graph_builder::RdbmsGraphConverter, graph_output};
use std::path::PathBuf;

#[cfg(all(feature = "jemalloc", not(target_env = "msvc")))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// relgraph - Convert a relational database into a property graph
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Source database URL (falls back to RELGRAPH_DATABASE_URL / DATABASE_URL)
    #[arg(long, conflicts_with = "fixture")]
    database_url: Option<String>,

    /// YAML fixture to convert instead of a live database
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only convert tables of this schema
    #[arg(long)]
    schema: Option<String>,

    /// Tables fetched concurrently
    #[arg(long)]
    parallelism: Option<usize>,

    /// Rows per fetch before a table is partitioned
    #[arg(long)]
    fetch_size: Option<u64>,

    /// Connection pool size
    #[arg(long)]
    max_connections: Option<u32>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

impl From<Cli> for config::CliConfig {
    fn from(cli: Cli) -> Self {
        config::CliConfig {
            database_url: cli.database_url,
            fixture: cli.fixture,
            schema: cli.schema,
            parallelism: cli.parallelism,
            fetch_size: cli.fetch_size,
            max_connections: cli.max_connections,
            output: cli.output,
            pretty: cli.pretty,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    dotenvy::dotenv().ok();

    let mut cli = Cli::parse();
    let config_file = cli.config.take();

    let config = match config::ConverterConfig::load(config_file.as_deref(), cli.into()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("relgraph v{}", env!("CARGO_PKG_VERSION"));

    let converter = RdbmsGraphConverter::from_config(&config).await?;
    let (graph, report) = converter.convert().await?;

    match &config.output {
        Some(path) => graph_output::write_json_file(&graph, path, config.pretty)?,
        None => graph_output::write_json(&graph, std::io::stdout().lock(), config.pretty)?,
    }

    log::info!("Conversion report: {}", serde_json::to_string(&report)?);
    Ok(())
}
