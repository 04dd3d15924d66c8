//! Logging setup
//!
//! `RUST_LOG` wins when set; otherwise `LOG_LEVEL` applies to this crate and
//! tower_http. With `LOG_DIR` pointing at an existing directory, output goes
//! to a daily rolling file instead of stdout. Production logs are JSON.

use std::path::Path;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

pub fn init_logger(log_level: &str, json_format: bool, log_dir: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("board_server={log_level},tower_http={log_level}").into());

    let (writer, ansi) = match log_dir.map(Path::new).filter(|p| p.is_dir()) {
        Some(dir) => (
            BoxMakeWriter::new(tracing_appender::rolling::daily(dir, "board-server")),
            false,
        ),
        None => (BoxMakeWriter::new(std::io::stdout), !json_format),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_thread_ids(false);

    if json_format {
        builder
            .json()
            .with_current_span(true)
            .with_target(true)
            .init();
    } else {
        builder
            .with_file(false)
            .with_line_number(false)
            .with_target(false)
            .init();
    }
}
