use anyhow::{Context, Result};
use chrono::Local;
use nu_ansi_term::{Color, Style};
use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    prelude::*,
    registry::LookupSpan,
    Layer,
};

/// Installs the global subscriber: colored console output plus an
/// append-mode plain-text copy in `log_path`.
///
/// The returned guard flushes the file writer and MUST be kept alive by
/// the caller until exit.
pub fn setup_logger(log_path: impl AsRef<Path>) -> Result<WorkerGuard> {
    let log_path = log_path.as_ref();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Error When Opening Log File: {}", log_path.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    let filter = tracing_subscriber::filter::Targets::new()
        .with_target("hyper", tracing::Level::WARN)
        .with_target("reqwest", tracing::Level::WARN)
        .with_default(tracing::Level::INFO);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(filter.clone());

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(TerminalFormatter)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to set global subscriber")?;

    Ok(guard)
}

// --- Formatters ---

struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

fn message_of(event: &Event<'_>) -> String {
    let mut msg_visitor = MessageVisitor {
        message: String::new(),
    };
    event.record(&mut msg_visitor);
    msg_visitor.message
}

/// Paints outcome keywords so results stand out from retry noise.
pub fn colorize(msg: &str) -> String {
    let green = Style::new().fg(Color::LightGreen).bold();
    let yellow = Style::new().fg(Color::Yellow).bold();
    let red = Style::new().fg(Color::LightRed).bold();

    if msg.contains("Not Changed Authority") {
        msg.replace(
            "Not Changed Authority",
            &green.paint("Not Changed Authority").to_string(),
        )
    } else if msg.contains("Changed Authority") {
        msg.replace("Changed Authority", &yellow.paint("Changed Authority").to_string())
    } else if msg.contains("Not Eligible") {
        msg.replace("Not Eligible", &red.paint("Not Eligible").to_string())
    } else {
        msg.to_string()
    }
}

pub struct TerminalFormatter;

impl<S, N> FormatEvent<S, N> for TerminalFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let level = *event.metadata().level();
        let level_style = match level {
            tracing::Level::ERROR => Style::new().fg(Color::Red),
            tracing::Level::WARN => Style::new().fg(Color::Yellow),
            tracing::Level::INFO => Style::new().fg(Color::Cyan),
            _ => Style::new().fg(Color::DarkGray),
        };

        write!(
            writer,
            "{} [{}] {}",
            Style::new().dimmed().paint(timestamp.to_string()),
            level_style.paint(level.to_string()),
            colorize(&message_of(event))
        )?;
        writeln!(writer)
    }
}

pub struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let level = event.metadata().level();

        write!(writer, "{} [{}] ", timestamp, level)?;
        writeln!(writer, "{}", message_of(event))
    }
}
