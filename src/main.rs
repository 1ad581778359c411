use anyhow::Context;
use medirag::{
    api::create_router,
    cli::{output::Output, Cli, Commands},
    db::{PineconeStore, VectorStore},
    rag::{
        chunker::TextChunker,
        embeddings::create_embedder,
        indexer::CorpusIndexer,
        loader::load_directory,
        pipeline::{ConfigComponentFactory, PipelineSettings, RagPipeline},
    },
    utils::{config::Config, logging::init_tracing},
    AppState,
};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match run(&cli, &output).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output.error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, output: &Output) -> anyhow::Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;
    init_tracing(
        config.telemetry.log_format,
        cli.verbose,
        config.telemetry.llm_tracing,
    )?;

    match cli.selected_command() {
        Commands::Serve => serve(Arc::new(config), output).await,
        Commands::Index { data, batch_size } => index(&config, data, *batch_size, output).await,
    }
}

async fn serve(config: Arc<Config>, output: &Output) -> anyhow::Result<()> {
    output.banner();

    let pipeline = Arc::new(RagPipeline::new(
        ConfigComponentFactory::new(config.clone()),
        PipelineSettings::from_config(&config),
    ));

    if config.rag.eager_init {
        output.info("Initializing RAG pipeline");
        match pipeline.warm_up().await {
            Ok(()) => output.success("RAG pipeline ready"),
            // The first request retries initialization.
            Err(e) => output.warning(&format!("{}; will retry on first request", e)),
        }
    }

    let addr = config.bind_address();
    let state = AppState {
        config: config.clone(),
        pipeline,
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    output.kv("Listening", &format!("http://{}", addr));
    output.kv("Index", &config.pinecone.index_name);
    output.kv("Model", &config.llm.model);
    output.kv("Embeddings", &config.rag.embedding_model);
    output.newline();
    tracing::info!(addr = %addr, "MediRAG server starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("MediRAG server stopped");
    Ok(())
}

async fn index(
    config: &Config,
    data: &Path,
    batch_size: usize,
    output: &Output,
) -> anyhow::Result<()> {
    let spec = config.index_spec()?;

    output.header("Indexing corpus");
    output.kv("Data", &data.display().to_string());
    output.kv("Index", &spec.name);
    output.kv("Embeddings", &spec.embedding_model);
    output.newline();

    output.step(1, 2, "Extracting text from PDFs");
    let loaded = load_directory(data).await?;
    for (path, reason) in &loaded.skipped {
        output.skipped(&path.display().to_string(), reason);
    }
    if loaded.documents.is_empty() {
        anyhow::bail!("No readable PDFs found under {}", data.display());
    }
    output.success(&format!("Loaded {} documents", loaded.documents.len()));

    output.step(2, 2, "Chunking, embedding and upserting");
    let embedder = create_embedder(config.embedding_model()?)?;
    let store = Arc::new(PineconeStore::new(&config.pinecone)?);
    let chunker = TextChunker::new(config.rag.chunk_size, config.rag.chunk_overlap)?;
    let indexer = CorpusIndexer::new(embedder, store.clone(), spec.clone(), chunker)
        .with_batch_size(batch_size);

    let report = indexer.index_documents(&loaded.documents).await?;

    if report.created_index {
        output.success(&format!("Created index '{}'", spec.name));
    }
    output.kv("Documents", &report.documents.to_string());
    output.kv("Chunks", &report.chunks.to_string());
    output.kv("Upserted", &report.upserted.to_string());
    match store.count(&spec.name).await {
        Ok(total) => output.kv("Vectors in index", &total.to_string()),
        Err(e) => tracing::debug!(error = %e, "Could not read index stats"),
    }
    output.complete("Corpus indexed");
    output.hint("Start answering questions with:");
    output.command("medirag-server serve");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
