use core::fmt::Display;
use std::io::{self, Write};

use log::{Level, LevelFilter, Log};
use owo_colors::OwoColorize;

struct Inner {
    sink:  Option<Box<dyn Write + Send>>,
    color: bool,
}

impl Inner {
    fn write_with_color(&mut self, color: Color, string: impl Display) {
        let use_color = self.color;
        let Some(sink) = self.sink.as_mut() else { return };
        let string: &dyn Display = match color {
            _ if !use_color => &string,
            Color::Default => &string,
            Color::Gray => &string.dimmed(),
            Color::BrightRed => &string.bright_red(),
            Color::BrightYellow => &string.bright_yellow(),
            Color::BrightBlue => &string.bright_blue(),
            Color::BrightCyan => &string.bright_cyan(),
            Color::BrightMagenta => &string.bright_magenta(),
        };
        // A failing log sink must never take the shell down.
        let _ = write!(sink, "{string}");
    }
}

struct ShellLogger {
    inner: spin::Mutex<Inner>,
}

static LOGGER: ShellLogger = ShellLogger {
    inner: spin::Mutex::new(Inner { sink: None, color: true }),
};

impl Log for ShellLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut inner = self.inner.lock();
        let level = record.level();
        inner.write_with_color(
            match level {
                Level::Error => Color::BrightRed,
                Level::Warn => Color::BrightYellow,
                Level::Info => Color::BrightBlue,
                Level::Debug => Color::BrightCyan,
                Level::Trace => Color::BrightMagenta,
            },
            format_args!("{level:5} "),
        );
        inner.write_with_color(Color::Gray, format_args!("[{}] ", record.target()));
        inner.write_with_color(Color::Default, record.args());
        inner.write_with_color(Color::Default, "\n");
    }

    fn flush(&self) {
        if let Some(sink) = self.inner.lock().sink.as_mut() {
            let _ = sink.flush();
        }
    }
}

/// Install the logger writing to stderr.
pub fn init(level: LevelFilter, color: bool) -> Result<(), log::SetLoggerError> {
    init_with_sink(level, color, Box::new(io::stderr()))
}

pub fn init_with_sink(
    level: LevelFilter,
    color: bool,
    sink: Box<dyn Write + Send>,
) -> Result<(), log::SetLoggerError> {
    log::set_logger(&LOGGER)?;
    {
        let mut inner = LOGGER.inner.lock();
        inner.sink = Some(sink);
        inner.color = color;
    }
    log::set_max_level(level);
    Ok(())
}

enum Color {
    Default,
    Gray,
    BrightRed,
    BrightYellow,
    BrightBlue,
    BrightCyan,
    BrightMagenta,
}
