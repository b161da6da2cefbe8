use ansi_term::{Color, Style};
use log::{Level, LevelFilter, Log, Metadata, Record};

/// A minimal logger that writes `[level] message` lines to stderr, coloring the level tag when
/// the output is a terminal.
pub struct Logger {
    colors_enabled: bool,
}

fn level_style(level: Level) -> Style {
    match level {
        Level::Error => Color::Red.bold(),
        Level::Warn => Color::Yellow.bold(),
        Level::Info => Color::Cyan.bold(),
        Level::Debug | Level::Trace => Style::new().dimmed(),
    }
}

impl Log for Logger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let tag = format!("[{}]", record.level().as_str().to_lowercase());
        if self.colors_enabled {
            eprintln!("{} {}", level_style(record.level()).paint(tag), record.args());
        } else {
            eprintln!("{} {}", tag, record.args());
        }
    }

    fn flush(&self) {}
}

pub fn init(max_level: LevelFilter, colors_enabled: bool) {
    log::set_boxed_logger(Box::new(Logger { colors_enabled })).expect("couldn't set up logger");
    log::set_max_level(max_level);
}
