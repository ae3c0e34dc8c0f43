//! `mmrag`: create multimodal collections, import records, search by text or
//! image and ask grounded questions against a Weaviate instance.

use std::path::PathBuf;

use {
    anyhow::{Context, Result, bail},
    clap::{Parser, Subcommand, ValueEnum},
    mmrag_config::MmragConfig,
    mmrag_vector::{
        MultimodalManager, SearchQuery,
        record::{load_records, sample_records},
    },
    tracing::{debug, info},
    tracing_subscriber::EnvFilter,
};

mod output;

#[derive(Parser)]
#[command(name = "mmrag", version, about = "Multimodal vector search and RAG")]
struct Cli {
    /// Config file (default: $MMRAG_CONFIG, ./mmrag.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override store.url
    #[arg(long, global = true, env = "MMRAG_STORE_URL")]
    store_url: Option<String>,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Serve Prometheus metrics on this address
    #[cfg(feature = "prometheus")]
    #[arg(long, global = true)]
    metrics_addr: Option<std::net::SocketAddr>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(clap::Args)]
struct QueryArgs {
    /// Search by text
    #[arg(long, conflicts_with = "image", required_unless_present = "image")]
    text: Option<String>,

    /// Search by image file
    #[arg(long)]
    image: Option<PathBuf>,

    /// Maximum results (default: search.limit)
    #[arg(short, long)]
    limit: Option<usize>,
}

impl QueryArgs {
    fn query(&self) -> Result<SearchQuery> {
        match (&self.text, &self.image) {
            (Some(text), None) => Ok(SearchQuery::Text(text.clone())),
            (None, Some(image)) => Ok(SearchQuery::Image(image.clone())),
            _ => bail!("pass exactly one of --text or --image"),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Create the configured collections that do not exist yet
    Schema,

    /// List collections in the store
    Collections,

    /// Import records into a collection
    Import {
        /// Target collection (default: default_collection)
        #[arg(long, conflicts_with = "all")]
        collection: Option<String>,

        /// Import into every configured collection
        #[arg(long)]
        all: bool,

        /// JSON array or JSON Lines file of records
        #[arg(long, conflicts_with = "sample", required_unless_present = "sample")]
        file: Option<PathBuf>,

        /// Import the built-in five-record sample dataset
        #[arg(long)]
        sample: bool,

        /// Objects per request (default: import.batch_size)
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Similarity search in one collection
    Search {
        #[arg(long)]
        collection: Option<String>,

        #[command(flatten)]
        query: QueryArgs,

        /// Properties to return (default: all standard properties)
        #[arg(long, value_delimiter = ',')]
        properties: Vec<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the same query against several collections
    Compare {
        /// Collections to compare (default: all configured)
        #[arg(long, value_delimiter = ',')]
        collections: Vec<String>,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Answer a question grounded in search results
    Ask {
        #[arg(long)]
        collection: Option<String>,

        #[command(flatten)]
        query: QueryArgs,

        #[arg(short, long)]
        question: String,

        /// Ollama endpoint (overrides generation.endpoint)
        #[arg(long)]
        endpoint: Option<String>,

        /// Model name (overrides generation.model)
        #[arg(long)]
        model: Option<String>,
    },

    /// Count objects in a collection
    Count {
        #[arg(long)]
        collection: Option<String>,
    },
}

fn init_logging(cli: &Cli) {
    let default = if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Pretty => builder.with_target(false).init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(cli: &Cli) -> Result<MmragConfig> {
    let mut config = mmrag_config::discover_and_load(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(url) = &cli.store_url {
        config.store.url = url.clone();
    }
    if let Command::Ask {
        endpoint, model, ..
    } = &cli.command
    {
        if let Some(endpoint) = endpoint {
            config.generation.endpoint = endpoint.clone();
        }
        if let Some(model) = model {
            config.generation.model = model.clone();
        }
    }
    mmrag_config::validate(&config).context("invalid configuration")?;
    debug!(?config, "effective configuration");
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(&cli);

    #[cfg(feature = "prometheus")]
    if let Some(addr) = cli.metrics_addr {
        mmrag_metrics::install_prometheus(addr)?;
    }

    let config = load_config(&cli)?;
    let manager = MultimodalManager::connect(config).await.map_err(report_err)?;
    run(&manager, cli.command).await
}

async fn run(manager: &MultimodalManager, command: Command) -> Result<()> {
    let config = manager.config();
    let collection_or_default =
        |name: Option<String>| name.unwrap_or_else(|| config.default_collection.clone());

    match command {
        Command::Schema => {
            let report = manager.ensure_collections().await;
            print!("{}", output::render_schema(&report));
            let names = manager.list_collections().await.map_err(report_err)?;
            println!("collections in store: {}", names.join(", "));
            if !report.failed().is_empty() {
                bail!("{} collection(s) could not be created", report.failed().len());
            }
        },
        Command::Collections => {
            for name in manager.list_collections().await.map_err(report_err)? {
                println!("{name}");
            }
        },
        Command::Import {
            collection,
            all,
            file,
            sample,
            batch_size,
        } => {
            let records = match (file, sample) {
                (Some(path), _) => load_records(&path).map_err(report_err)?,
                (None, true) => sample_records(),
                (None, false) => bail!("pass --file or --sample"),
            };
            info!(records = records.len(), "records loaded");
            if all {
                let mut failures = 0;
                for (name, result) in manager.import_into_all(&records, batch_size).await {
                    match result {
                        Ok(report) => println!("{}", output::render_import(&name, &report)),
                        Err(e) => {
                            failures += 1;
                            println!("{name}: failed: {}", output::describe(&e));
                        },
                    }
                }
                if failures > 0 {
                    bail!("import failed for {failures} collection(s)");
                }
            } else {
                let name = collection_or_default(collection);
                let report = manager
                    .import(&name, &records, batch_size)
                    .await
                    .map_err(report_err)?;
                println!("{}", output::render_import(&name, &report));
            }
        },
        Command::Search {
            collection,
            query,
            properties,
            json,
        } => {
            let name = collection_or_default(collection);
            let limit = query.limit.unwrap_or(config.search.limit);
            let return_properties = (!properties.is_empty()).then_some(properties.as_slice());
            let results = match manager
                .search(&name, &query.query()?, limit, return_properties)
                .await
            {
                Ok(results) => results,
                Err(e) if e.is_missing_collection() => {
                    eprintln!("collection '{name}' does not exist; run `mmrag schema` first");
                    Vec::new()
                },
                Err(e) => return Err(report_err(e)),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                println!("{name}: {} result(s)", results.len());
                print!("{}", output::render_results(&results));
            }
        },
        Command::Compare { collections, query } => {
            let limit = query.limit.unwrap_or(config.search.limit);
            let compared = manager
                .compare(&collections, &query.query()?, limit)
                .await
                .map_err(report_err)?;
            print!("{}", output::render_comparison(&compared));
        },
        Command::Ask {
            collection,
            query,
            question,
            ..
        } => {
            let name = collection_or_default(collection);
            let answer = manager
                .answer(&name, &query.query()?, &question, query.limit)
                .await
                .map_err(report_err)?;
            match answer {
                Some(text) => println!("{text}"),
                None => println!("(no answer: nothing relevant was retrieved or the model returned no text)"),
            }
        },
        Command::Count { collection } => {
            let name = collection_or_default(collection);
            let count = manager.count(&name).await.map_err(report_err)?;
            println!("{name}: {count} object(s)");
        },
    }
    Ok(())
}

/// Convert a library error into an `anyhow` error that carries its hint.
fn report_err(error: mmrag_common::Error) -> anyhow::Error {
    anyhow::anyhow!(output::describe(&error))
}
