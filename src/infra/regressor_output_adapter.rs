use std::io::Write;
use std::path::PathBuf;
use tracing::info;

use super::create_output;
use crate::app::ports::RegressorOutputPort;
use crate::config::{Participant, PathTemplate};
use crate::constants::{format_float, REGRESSOR_MISSING};
use crate::error::{PrepError, Result};
use crate::manifest::OutputFile;
use crate::pipeline::regressors::RegressorColumn;

/// Writes each regressor as a headerless one-value-per-line text file
pub struct FileRegressorOutputAdapter {
    root: PathBuf,
    dir_template: PathTemplate,
}

impl FileRegressorOutputAdapter {
    pub fn new(root: PathBuf, dir_template: PathTemplate) -> Self {
        Self { root, dir_template }
    }
}

impl RegressorOutputPort for FileRegressorOutputAdapter {
    fn write_regressors(&self, participant: &Participant, columns: &[RegressorColumn]) -> Result<Vec<OutputFile>> {
        let dir = self.dir_template.render(&self.root, participant);
        info!(participant = %participant.label, dir = %dir.display(), files = columns.len(), "Writing regressors");

        let mut outputs = Vec::with_capacity(columns.len());
        for column in columns {
            let path = dir.join(format!("{}_{}.txt", participant.label, column.regressor.suffix()));
            let mut writer = create_output(&path)?;
            for value in &column.values {
                let line = value.map(format_float).unwrap_or_else(|| REGRESSOR_MISSING.to_string());
                writeln!(writer, "{}", line).map_err(|e| PrepError::io(&path, e))?;
            }
            writer.flush().map_err(|e| PrepError::io(&path, e))?;
            drop(writer);
            outputs.push(OutputFile::describe(&path, column.values.len())?);
        }
        Ok(outputs)
    }
}
