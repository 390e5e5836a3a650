use crate::config::Participant;
use crate::error::Result;
use crate::manifest::OutputFile;
use crate::pipeline::regressors::RegressorColumn;
use crate::pipeline::DesignMatrix;
use crate::types::{CorrectedEvent, ObservationRow};

// Output-side ports; each stage writes through one of these

pub trait DesignMatrixOutputPort: Send + Sync {
    fn write_design_matrix(&self, matrix: &DesignMatrix) -> Result<OutputFile>;
}

pub trait EventlistOutputPort: Send + Sync {
    fn write_eventlist(&self, participant: &Participant, events: &[CorrectedEvent]) -> Result<OutputFile>;
}

pub trait RegressorOutputPort: Send + Sync {
    /// One file per regressor column
    fn write_regressors(&self, participant: &Participant, columns: &[RegressorColumn]) -> Result<Vec<OutputFile>>;
}

pub trait ObservationOutputPort: Send + Sync {
    fn write_observations(
        &self,
        rows: &[ObservationRow],
        extra_columns: &[String],
        include_sentence_order: bool,
    ) -> Result<OutputFile>;
}
