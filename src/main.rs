use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use imgserver::application::{InlineImagesUseCase, RenderPageUseCase};
use imgserver::domain::{CancelSignal, ImageFetcher};
use imgserver::infrastructure::{
    AppConfig, BackoffFetcher, CliArgs, ConfigLoader, HtmlImageScanner, HttpImageFetcher,
    PageLoader, build_http_client,
};
use imgserver::presentation::{ErrorResponse, render_fragment, serve};

/// Exit status for failures caused by the page or its images.
const CLIENT_ERROR_EXIT: u8 = 2;

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = &config.log_path {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        // stdout carries the fragment, so logs go to stderr.
        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let loader = match args.config.as_deref().and_then(Path::parent) {
        Some(dir) => ConfigLoader::with_dir(dir.to_path_buf()),
        None => ConfigLoader::new()?,
    };

    let mut config = loader.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

fn build_fetcher(config: &AppConfig, client: reqwest::Client) -> Arc<dyn ImageFetcher> {
    let fetcher = HttpImageFetcher::new(client).with_max_image_bytes(config.http.max_image_bytes);

    if config.retry.enabled {
        Arc::new(BackoffFetcher::new(fetcher, config.retry.to_policy()))
    } else {
        Arc::new(fetcher)
    }
}

fn create_use_case(config: &AppConfig) -> Result<RenderPageUseCase> {
    let client = build_http_client(&config.http)?;

    let inliner = InlineImagesUseCase::new(
        Arc::new(HtmlImageScanner::new()),
        build_fetcher(config, client.clone()),
    )
    .with_max_concurrent_fetches(config.fetch_limit());

    let pages = PageLoader::new(client).with_max_page_bytes(config.http.max_page_bytes);
    Ok(RenderPageUseCase::new(Arc::new(pages), inliner))
}

async fn inline_once(
    use_case: &RenderPageUseCase,
    page_url: &str,
    cancel: CancelSignal,
) -> ExitCode {
    match use_case.execute(page_url, cancel).await {
        Ok(page) => {
            println!("{}", render_fragment(&page.images));
            ExitCode::SUCCESS
        }
        Err(e) => {
            let response = ErrorResponse::from_error(&e);
            println!("{}", response.body);
            if e.is_client_error() {
                ExitCode::from(CLIENT_ERROR_EXIT)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn serve_http(
    config: &AppConfig,
    use_case: RenderPageUseCase,
    shutdown: CancelSignal,
) -> Result<ExitCode> {
    let listener = TcpListener::bind(config.server.listen).await?;
    serve(listener, use_case, shutdown).await?;
    info!("Server stopped");
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = imgserver::VERSION, url = ?args.url, serve = args.serve, "Starting imgserver");

    let use_case = create_use_case(&config)?;

    let cancel = CancelSignal::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling outstanding work");
            on_interrupt.cancel();
        }
    });

    match args.url.as_deref() {
        Some(page_url) => Ok(inline_once(&use_case, page_url, cancel).await),
        None => serve_http(&config, use_case, cancel).await,
    }
}
