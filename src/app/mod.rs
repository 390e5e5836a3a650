pub mod assemble_use_case;
pub mod design_matrix_use_case;
pub mod eventlist_use_case;
pub mod ports;
pub mod regressor_use_case;

#[cfg(test)]
pub(crate) mod fixtures;

use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::parser::design_matrix::load_design_matrix;
use crate::pipeline::{DesignMatrix, StageReport};

/// Read the design matrix written by the builder and index it by bin
pub fn load_indexed_design_matrix(config: &Config, report: &mut StageReport) -> Result<DesignMatrix> {
    let path = config.stimuli.design_matrix_path();
    let file = load_design_matrix(&path)?;
    report.absorb_malformed(file.parsed.malformed);
    let matrix = DesignMatrix::new(file.parsed.rows, file.extra_columns)?;
    info!(
        path = %path.display(),
        words = matrix.len(),
        extra_columns = matrix.extra_columns().len(),
        "Loaded design matrix"
    );
    Ok(matrix)
}
