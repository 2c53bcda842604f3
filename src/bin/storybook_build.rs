//! Storybook Build Binary
//!
//! Builds one bundle from a build config and exits non-zero if the run
//! aborted or any localization group failed.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `BOOK_CONFIG`: path of the JSON build config (default: book.json)
//! - `BOOK_ROOT`: directory all config paths are relative to (default: .)
//! - `BOOK_OUTPUT_DIR`: overrides `output_dir`
//! - `BOOK_CHAPTERS`: overrides `chapter_count`
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! BOOK_CONFIG=book.json BOOK_CHAPTERS=3 LOG_FORMAT=pretty cargo run --bin storybook_build
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use tracing::{error, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use storybook_kernel::{BookPipeline, BuildConfig, FsContentStore, RunContext};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "storybook_build=info,storybook_kernel=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true)
            )
            .init();
    }
}

fn main() -> ExitCode {
    init_tracing();

    let root = PathBuf::from(std::env::var("BOOK_ROOT").unwrap_or_else(|_| ".".to_string()));
    let config_path = PathBuf::from(std::env::var("BOOK_CONFIG").unwrap_or_else(|_| "book.json".to_string()));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        root = %root.display(),
        config = %config_path.display(),
        "Starting storybook build"
    );

    let store = FsContentStore::new(&root);
    let mut config = match BuildConfig::load(&store, &config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load build config");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.apply_overrides(|var| std::env::var(var).ok()) {
        error!(error = %e, "Invalid environment override");
        return ExitCode::FAILURE;
    }

    let start = Instant::now();
    let mut ctx = RunContext::new();
    let result = BookPipeline::new(&store, config).run(&mut ctx);
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(build) => {
            let stats = ctx.stats();
            info!(
                run_id = %build.run_id,
                elapsed_ms,
                files = build.written.len(),
                table_hits = stats.tables.hits,
                table_misses = stats.tables.misses,
                "Run complete"
            );
            println!("{}", build.summary());
            if build.is_success() {
                ExitCode::SUCCESS
            } else {
                if let Some(first) = build.report.first_error() {
                    error!(diagnostic = %first, "Bundle incomplete");
                }
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("build failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
