use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::Local;

pub const DEFAULT_LOG_FILE: &str = "image_upscaler.log";

static LOG_FILE: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Choose where log lines are appended. `None` keeps logging console-only,
/// as does never calling this. Only the first call has any effect.
pub fn init(path: Option<&Path>) {
    let _ = LOG_FILE.set(path.map(Path::to_path_buf));
}

fn log_file() -> Option<&'static Path> {
    LOG_FILE.get().and_then(|p| p.as_deref())
}

fn append(entry: &str) {
    let Some(path) = log_file() else {
        return;
    };
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = file.write_all(entry.as_bytes());
    }
}

pub fn format_entry(level: Option<&str>, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    match level {
        Some(level) => format!("[{}] {}: {}\n", timestamp, level, message),
        None => format!("[{}] {}\n", timestamp, message),
    }
}

pub fn log_message(message: &str) {
    let entry = format_entry(None, message);
    println!("{}", entry.trim_end());
    append(&entry);
}

pub fn log_error(message: &str) {
    let entry = format_entry(Some("ERROR"), message);
    eprintln!("{}", entry.trim_end());
    append(&entry);
}
