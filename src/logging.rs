use once_cell::sync::OnceCell;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Initialise logging. Debug mode logs at `debug` and lets `RUST_LOG`
/// override the filter; otherwise the level is pinned to `info` so a stray
/// `RUST_LOG` in the user's environment cannot flood the console.
///
/// When `log_file` is given, output is mirrored to that file through a
/// non-blocking writer. Calling this twice is harmless; the first subscriber
/// wins.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    let level = if debug { "debug" } else { "info" };
    let filter = || {
        if debug {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
        } else {
            EnvFilter::new(level)
        }
    };

    let file_layer = log_file.and_then(|path| {
        let dir = path.parent().map(PathBuf::from).unwrap_or_default();
        let name = path.file_name()?.to_owned();
        if !dir.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(&dir);
        }
        let appender = tracing_appender::rolling::never(dir, name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter()),
        )
    });

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_filter(filter()))
        .with(file_layer)
        .try_init();
}
