pub mod design_matrix_output_adapter;
pub mod eventlist_output_adapter;
pub mod observation_output_adapter;
pub mod regressor_output_adapter;

use std::fmt::Display;
use std::fs::{self, File, OpenOptions};
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

use crate::constants::format_float;
use crate::error::{PrepError, Result};

/// Create (or truncate) an output file, creating parent directories first
pub(crate) fn create_output(path: &Path) -> Result<BufWriter<File>> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| PrepError::io(dir, e))?;
    }
    debug!(path = %path.display(), "Creating output file");
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|e| PrepError::io(path, e))?;
    Ok(BufWriter::new(file))
}

// Missing values are written as empty CSV fields

pub(crate) fn opt_float(value: Option<f64>) -> String {
    value.map(format_float).unwrap_or_default()
}

pub(crate) fn opt_display<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub(crate) fn opt_text(value: Option<&String>) -> String {
    value.cloned().unwrap_or_default()
}
