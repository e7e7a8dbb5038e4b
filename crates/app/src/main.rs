use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use docingest_core::{
    acquire_index, chunk_text, ingest_folder, upsert_document, ChunkingConfig,
    DefaultContentLoader, DefaultContentStatus, DocumentIndex, DocumentProcessor,
    HttpIndexProvider, IndexSettings, IngestionReport, MemoryIndex, OverlapMode, ProcessorConfig,
    RawDocument, TempStaging, UpsertOutcome, DEFAULT_INDEX_DESCRIPTION, DEFAULT_INDEX_NAME,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docingest", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Base URL of the index service
    #[arg(long, env = "DOCINGEST_INDEX_URL")]
    index_url: Option<String>,

    /// Bearer token for the index service
    #[arg(long, env = "DOCINGEST_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Index id to write to; looked up by name or created when absent
    #[arg(long, env = "DOCINGEST_INDEX_ID")]
    index_id: Option<String>,

    #[arg(long, env = "DOCINGEST_INDEX_NAME", default_value = DEFAULT_INDEX_NAME)]
    index_name: String,

    /// Embedding model requested when a new index is created
    #[arg(long, env = "DOCINGEST_EMBEDDING_MODEL")]
    embedding_model: Option<String>,

    /// Maximum characters per chunk
    #[arg(long, default_value = "200")]
    chunk_size: usize,

    /// Overlap budget in characters
    #[arg(long, default_value = "20")]
    overlap: usize,

    #[arg(long, value_enum, default_value_t = OverlapArg::Sentences)]
    overlap_mode: OverlapArg,

    /// Per-file size limit in megabytes
    #[arg(long, default_value = "20")]
    max_file_size_mb: u64,

    /// Index into process memory instead of the remote service.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Scratch directory for staged uploads
    #[arg(long, default_value = "temp_uploads")]
    temp_dir: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum OverlapArg {
    Sentences,
    Characters,
}

#[derive(Subcommand)]
enum Command {
    /// Stage, extract, chunk and upsert a single file.
    Ingest {
        #[arg(long)]
        file: PathBuf,
    },
    /// Ingest every supported file under a folder, recursively.
    IngestDir {
        #[arg(long)]
        folder: PathBuf,
    },
    /// Index the first PDF of a default-content directory if it is not indexed yet.
    LoadDefault {
        #[arg(long, default_value = "default_content")]
        dir: PathBuf,
    },
    /// Print the chunks of a file without touching any index.
    Chunk {
        #[arg(long)]
        file: PathBuf,
    },
}

/// Everything a command needs, built once at startup and passed by reference.
struct AppContext {
    processor: DocumentProcessor,
    chunking: ChunkingConfig,
    index: Box<dyn DocumentIndex>,
}

impl Cli {
    fn processor(&self) -> DocumentProcessor {
        DocumentProcessor::new(ProcessorConfig {
            max_file_size_bytes: self.max_file_size_mb.saturating_mul(1024 * 1024),
            ..ProcessorConfig::default()
        })
    }

    fn chunking(&self) -> anyhow::Result<ChunkingConfig> {
        let config = ChunkingConfig {
            max_chars: self.chunk_size,
            overlap_chars: self.overlap,
            overlap_mode: match self.overlap_mode {
                OverlapArg::Sentences => OverlapMode::SentenceCount,
                OverlapArg::Characters => OverlapMode::Characters,
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn index_settings(&self) -> IndexSettings {
        IndexSettings {
            endpoint: self.index_url.clone(),
            api_key: self.api_key.clone(),
            default_index_id: self.index_id.clone(),
            index_name: self.index_name.clone(),
            description: DEFAULT_INDEX_DESCRIPTION.to_string(),
            embedding_model: self.embedding_model.clone(),
        }
    }
}

impl AppContext {
    async fn connect(cli: &Cli) -> anyhow::Result<Self> {
        let index: Box<dyn DocumentIndex> = if cli.dry_run {
            info!("dry run, indexing into memory");
            Box::new(MemoryIndex::new("dry-run"))
        } else {
            let settings = cli.index_settings();
            let Some(endpoint) = settings.endpoint.as_deref() else {
                bail!("no index service configured; pass --index-url, set DOCINGEST_INDEX_URL or use --dry-run");
            };
            let provider = HttpIndexProvider::new(endpoint, settings.api_key.clone())?;
            let handle = acquire_index(&provider, &settings)
                .await
                .context("could not acquire an index")?;
            info!(index_id = handle.id(), "using index");
            Box::new(handle)
        };

        Ok(Self {
            processor: cli.processor(),
            chunking: cli.chunking()?,
            index,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "docingest boot"
    );

    if let Command::Chunk { file } = &cli.command {
        return print_chunks(&cli.processor(), &cli.chunking()?, file);
    }

    let ctx = AppContext::connect(&cli).await?;

    match &cli.command {
        Command::Ingest { file } => ingest_single(&ctx, &cli.temp_dir, file).await?,
        Command::IngestDir { folder } => {
            let report = ingest_folder(&ctx.processor, ctx.index.as_ref(), folder, &ctx.chunking)
                .await?;
            print_report(&report);
        }
        Command::LoadDefault { dir } => {
            let loader = DefaultContentLoader::new(dir, ctx.processor.clone());
            match loader.load(ctx.index.as_ref(), &ctx.chunking).await {
                DefaultContentStatus::AlreadyIndexed => println!("default content already indexed"),
                DefaultContentStatus::Indexed { chunks } => {
                    println!("default content indexed: {chunks} chunks")
                }
                DefaultContentStatus::Missing => bail!("no default PDF found in {}", dir.display()),
                DefaultContentStatus::Failed(reason) => bail!("default content failed: {reason}"),
            }
        }
        Command::Chunk { .. } => {}
    }

    Ok(())
}

async fn ingest_single(ctx: &AppContext, temp_dir: &Path, file: &Path) -> anyhow::Result<()> {
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .with_context(|| format!("{} has no file name", file.display()))?;
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("could not read {}", file.display()))?;

    let staging = TempStaging::new(temp_dir)?;
    let document = ctx
        .processor
        .process_raw(&staging, &RawDocument::new(file_name, bytes));
    if let Err(error) = staging.cleanup() {
        warn!(%error, "staging cleanup failed");
    }

    let Some(document) = document else {
        bail!("could not process {}", file.display());
    };

    let outcome = upsert_document(ctx.index.as_ref(), document, &ctx.chunking).await;
    print_outcome(&file.display().to_string(), &outcome);
    if let UpsertOutcome::Error { message, .. } = outcome {
        bail!(message);
    }
    Ok(())
}

fn print_chunks(
    processor: &DocumentProcessor,
    chunking: &ChunkingConfig,
    file: &Path,
) -> anyhow::Result<()> {
    let document = processor.try_process_file(file)?;
    let chunks = chunk_text(&document.text, chunking)?;

    for (index, chunk) in chunks.iter().enumerate() {
        println!("[{index}] ({} chars)\n{chunk}", chunk.chars().count());
    }
    println!("{} chunks", chunks.len());
    Ok(())
}

fn print_outcome(path: &str, outcome: &UpsertOutcome) {
    println!("{path}: {} - {}", outcome.status(), outcome.message());
}

fn print_report(report: &IngestionReport) {
    for file in &report.outcomes {
        print_outcome(&file.path.display().to_string(), &file.outcome);
    }

    if !report.skipped_files.is_empty() {
        warn!(skipped_files = report.skipped_files.len(), "some files were skipped");
        for skipped in &report.skipped_files {
            warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped file");
        }
    }

    println!(
        "{} added, {} already indexed, {} failed, {} skipped at {}",
        report.count("success"),
        report.count("skipped"),
        report.count("error"),
        report.skipped_files.len(),
        Utc::now().to_rfc3339()
    );
}
