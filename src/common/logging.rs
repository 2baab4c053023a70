//! Logging and tracing configuration
//!
//! Operator-facing text goes to stdout with `println!`. Diagnostics go
//! through `tracing` to stderr so they never interleave with a test card
//! in a way that hides the prompt.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "termihub_manual=info,warn";

/// Filter used with `--verbose`
const VERBOSE_FILTER: &str = "termihub_manual=debug,info";

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// `verbose` only changes the fallback used when `RUST_LOG` is unset.
pub fn init_cli(verbose: bool) {
    let fallback = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // A second init (e.g. from a test harness) is harmless
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}
