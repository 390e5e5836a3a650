use csv::WriterBuilder;
use std::path::PathBuf;
use tracing::info;

use super::{create_output, opt_display, opt_float, opt_text};
use crate::app::ports::DesignMatrixOutputPort;
use crate::constants::DESIGN_MATRIX_COLUMNS;
use crate::error::{PrepError, Result};
use crate::manifest::OutputFile;
use crate::pipeline::DesignMatrix;
use crate::types::WordRecord;

/// Writes the design matrix as a headed CSV file
pub struct FileDesignMatrixOutputAdapter {
    path: PathBuf,
}

impl FileDesignMatrixOutputAdapter {
    pub fn new(path: PathBuf) -> Self {
        info!("Design matrix output: {}", path.display());
        Self { path }
    }
}

/// Field values in [`DESIGN_MATRIX_COLUMNS`] order
pub fn word_fields(word: &WordRecord) -> Vec<String> {
    let f = &word.features;
    vec![
        word.bin_id.to_string(),
        opt_display(word.bin_id_old),
        word.sentence_id.clone(),
        word.word.clone(),
        opt_float(word.onset),
        opt_float(word.offset),
        opt_float(word.prominence_value),
        opt_float(word.boundary_value),
        opt_display(word.prominence_label),
        opt_display(f.word_sequence),
        opt_float(f.max_f0),
        opt_float(f.min_f0),
        opt_float(f.mean_f0),
        opt_float(f.mean_intensity),
        opt_float(f.frequency),
        opt_display(f.pos_binary),
        opt_text(f.pos_detail.as_ref()),
        opt_text(f.lemma.as_ref()),
        opt_display(f.word_length),
        opt_float(f.surprisal.ngram),
        opt_float(f.surprisal.gpt),
        opt_float(f.surprisal.bert),
    ]
}

impl DesignMatrixOutputPort for FileDesignMatrixOutputAdapter {
    fn write_design_matrix(&self, matrix: &DesignMatrix) -> Result<OutputFile> {
        let mut writer = WriterBuilder::new().from_writer(create_output(&self.path)?);

        let mut header: Vec<&str> = DESIGN_MATRIX_COLUMNS.to_vec();
        header.extend(matrix.extra_columns().iter().map(String::as_str));
        writer.write_record(&header)?;

        for word in matrix.rows() {
            let mut fields = word_fields(word);
            fields.extend(word.extra.iter().cloned());
            writer.write_record(&fields)?;
        }
        writer.flush().map_err(|e| PrepError::io(&self.path, e))?;
        drop(writer);

        OutputFile::describe(&self.path, matrix.len())
    }
}
