//! Logging setup.
//!
//! All user-facing output goes through `log`. Info lines print bare, other
//! levels get a prefix. With `--logfile` every line is mirrored to the file
//! with ANSI escapes removed.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use env_logger::{Builder, Target};
use log::{Level, LevelFilter};

use crate::error::CliError;

/// Writes to stdout and a plain-text copy to a file.
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write_all(buf)?;
        self.file.write_all(&strip_ansi_escapes::strip(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()?;
        self.file.flush()
    }
}

pub(crate) fn init(quiet: bool, verbose: bool, logfile: Option<&Path>) -> Result<(), CliError> {
    let level = if quiet {
        LevelFilter::Warn
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = Builder::new();
    builder.filter_level(level);
    builder.parse_default_env();

    builder.format(move |buf, record| {
        if verbose {
            writeln!(
                buf,
                "[{} {:<5} {}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        } else {
            match record.level() {
                Level::Info => writeln!(buf, "{}", record.args()),
                Level::Warn => writeln!(buf, "warning: {}", record.args()),
                Level::Error => writeln!(buf, "error: {}", record.args()),
                _ => writeln!(buf, "{}: {}", record.level(), record.args()),
            }
        }
    });

    match logfile {
        Some(path) => {
            let file = File::create(path)?;
            builder.target(Target::Pipe(Box::new(TeeWriter { file })));
        }
        None => {
            builder.target(Target::Stdout);
        }
    }

    builder
        .try_init()
        .map_err(|e| CliError::other(format!("Could not initialize logging: {e}")))
}
