//! Tracing subscriber setup.

use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::types::{AppError, Result};
use crate::utils::config::LogFormat;

/// Target of the per-call prompt/answer events emitted when `LLM_TRACING` is on.
pub const LLM_TRACE_TARGET: &str = "llm_trace";

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "medirag=debug,medirag_server=debug,tower_http=debug,llm_trace=info,info"
    } else {
        "medirag=info,medirag_server=info,tower_http=info,llm_trace=info,warn"
    }
}

/// Build the filter: `RUST_LOG` if set, otherwise [`default_filter`]. With
/// `llm_tracing` on, `llm_trace` events pass whatever `RUST_LOG` says.
pub fn build_filter(verbose: bool, llm_tracing: bool) -> Result<EnvFilter> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));
    if !llm_tracing {
        return Ok(filter);
    }

    let directive = format!("{}=info", LLM_TRACE_TARGET)
        .parse::<Directive>()
        .map_err(|e| AppError::Internal(format!("Invalid llm_trace directive: {}", e)))?;
    Ok(filter.add_directive(directive))
}

/// Install the global subscriber.
pub fn init_tracing(format: LogFormat, verbose: bool, llm_tracing: bool) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(verbose, llm_tracing)?)
        .with_writer(std::io::stderr)
        .with_target(true);

    match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
    }
    .map_err(|e| AppError::Internal(format!("Failed to initialize logging: {}", e)))
}
