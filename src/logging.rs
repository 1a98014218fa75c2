use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use env_logger::{Builder, Env, Target};

pub fn log_file_path(log_dir: &Path, date: NaiveDate) -> PathBuf {
    log_dir.join(format!("fx_rates_{}.log", date.format("%Y-%m-%d")))
}

/// Sends `log` output to one file per day under `log_dir`, at INFO and above
/// unless `RUST_LOG` says otherwise. Falls back to stderr when the file can't be opened.
pub fn init(log_dir: &Path, today: NaiveDate) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} - {} - {}",
            Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            record.level(),
            record.args()
        )
    });

    let file_error = match open_log_file(log_dir, today) {
        Ok(file) => {
            builder.target(Target::Pipe(Box::new(file)));
            None
        }
        Err(e) => Some(e),
    };

    // A logger may already be installed (e.g. under test harnesses).
    let _ = builder.try_init();

    if let Some(e) = file_error {
        log::warn!("Logging to stderr, can't open log file: {:#}", e);
    }
}

fn open_log_file(log_dir: &Path, today: NaiveDate) -> Result<fs::File> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Can't create log directory {}", log_dir.display()))?;

    let path = log_file_path(log_dir, today);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Can't open log file {}", path.display()))
}
