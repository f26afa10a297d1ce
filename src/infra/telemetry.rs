use std::{
    fmt::{self, Write as _},
    io::{self, IsTerminal},
};

use tracing::{
    Dispatch, Event, Level, Subscriber,
    field::{Field, Visit},
};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter,
    fmt::{FmtContext, FormatEvent, FormatFields, format::Writer},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

const GREEN: &str = "32";
const BLUE: &str = "34";
const RED: &str = "31";

/// Install a global tracing subscriber using the provided logging settings.
///
/// Everything is written to stderr; colors are used only when stderr is a terminal.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();
    let ansi = io::stderr().is_terminal();

    let fmt_layer = match logging.format {
        LogFormat::Console => tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .event_format(ConsoleFormat { ansi })
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(io::stderr)
            .with_ansi(ansi)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Console subscriber for errors raised before [`init`] had a chance to run.
pub fn fallback_dispatch() -> Dispatch {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(Level::ERROR)
        .event_format(ConsoleFormat {
            ansi: io::stderr().is_terminal(),
        })
        .finish();
    Dispatch::new(subscriber)
}

/// One line per event: `[message]` for INFO, `WARNING: message` and `ERROR: message`.
/// An `error` field is appended to the message.
#[derive(Debug, Clone, Copy)]
struct ConsoleFormat {
    ansi: bool,
}

impl<S, N> FormatEvent<S, N> for ConsoleFormat
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
        let mut fields = ConsoleFields::default();
        event.record(&mut fields);
        let line = console_line(*event.metadata().level(), &fields.text(), self.ansi);
        writeln!(writer, "{line}")
    }
}

fn console_line(level: Level, text: &str, ansi: bool) -> String {
    let paint = |line: String, color: &str| {
        if ansi {
            format!("\x1b[0;{color}m{line}\x1b[0m")
        } else {
            line
        }
    };

    match level {
        Level::INFO => format!("[{}]", paint(text.to_string(), GREEN)),
        Level::WARN => paint(format!("WARNING: {text}"), BLUE),
        Level::ERROR => paint(format!("ERROR: {text}"), RED),
        _ => text.to_string(),
    }
}

#[derive(Debug, Default)]
struct ConsoleFields {
    message: String,
    error: Option<String>,
}

impl ConsoleFields {
    fn text(&self) -> String {
        match &self.error {
            Some(error) if self.message.is_empty() => error.clone(),
            Some(error) => format!("{}: {error}", self.message),
            None => self.message.clone(),
        }
    }
}

impl Visit for ConsoleFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message.push_str(value),
            "error" => self.error = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => {
                let _ = write!(self.message, "{value:?}");
            }
            "error" => self.error = Some(format!("{value:?}")),
            _ => {}
        }
    }
}
