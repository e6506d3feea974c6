//! Tracing output routed to the browser console
//!
//! Each formatted event is buffered and written with the console method that
//! matches its level. Timestamps are disabled: wasm32-unknown-unknown has no
//! system clock.

use std::io::{self, Write};

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use wasm_bindgen::JsValue;
use web_sys::console;

/// Error raised while installing the console subscriber
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid log level '{0}', expected trace, debug, info, warn or error")]
    InvalidLevel(String),
    #[error("Failed to install log subscriber: {0}")]
    Install(String),
}

/// Console method an event is written with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleMethod {
    Error,
    Warn,
    Info,
    Debug,
    Log,
}

impl ConsoleMethod {
    pub fn for_level(level: Level) -> Self {
        match level {
            Level::ERROR => ConsoleMethod::Error,
            Level::WARN => ConsoleMethod::Warn,
            Level::INFO => ConsoleMethod::Info,
            Level::DEBUG => ConsoleMethod::Debug,
            _ => ConsoleMethod::Log,
        }
    }

    fn write(self, message: &JsValue) {
        match self {
            ConsoleMethod::Error => console::error_1(message),
            ConsoleMethod::Warn => console::warn_1(message),
            ConsoleMethod::Info => console::info_1(message),
            ConsoleMethod::Debug => console::debug_1(message),
            ConsoleMethod::Log => console::log_1(message),
        }
    }
}

/// Text of one formatted event, without the trailing newline
fn event_text(buffer: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(buffer);
    let text = text.trim_end();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Creates one `ConsoleWriter` per event
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleMakeWriter;

/// Buffers one event and flushes it to the console when dropped
pub struct ConsoleWriter {
    level: Level,
    buffer: Vec<u8>,
}

impl ConsoleWriter {
    fn new(level: Level) -> Self {
        Self { level, buffer: Vec::new() }
    }
}

impl Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        if let Some(text) = event_text(&self.buffer) {
            ConsoleMethod::for_level(self.level).write(&JsValue::from_str(&text));
        }
    }
}

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter::new(Level::INFO)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter::new(*meta.level())
    }
}

/// Parse a level name, defaulting to `info`
pub fn parse_level(level: Option<&str>) -> Result<Level, LoggingError> {
    match level {
        None => Ok(Level::INFO),
        Some(name) => name
            .trim()
            .parse::<Level>()
            .map_err(|_| LoggingError::InvalidLevel(name.to_string())),
    }
}

/// Install the console subscriber as the global default
pub fn init(level: Option<&str>) -> Result<(), LoggingError> {
    let level = parse_level(level)?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .without_time()
        .with_writer(ConsoleMakeWriter)
        .try_init()
        .map_err(|err| LoggingError::Install(err.to_string()))
}
