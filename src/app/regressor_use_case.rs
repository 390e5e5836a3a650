use tracing::instrument;

use crate::app::load_indexed_design_matrix;
use crate::app::ports::RegressorOutputPort;
use crate::config::{Config, Participant, VariantPlan};
use crate::error::Result;
use crate::manifest::OutputFile;
use crate::parser::eventlist::ExportedEventlistParser;
use crate::parser::load;
use crate::pipeline::regressors::build_regressors;
use crate::pipeline::{DesignMatrix, StageReport};

/// Use case for exporting per-event predictor files for each participant
pub struct RegressorUseCase<'a> {
    config: &'a Config,
    plan: &'a VariantPlan,
    output: Box<dyn RegressorOutputPort>,
}

impl<'a> RegressorUseCase<'a> {
    pub fn new(config: &'a Config, plan: &'a VariantPlan, output: Box<dyn RegressorOutputPort>) -> Self {
        Self { config, plan, output }
    }

    #[instrument(skip(self), fields(variant = %self.plan.name))]
    pub fn run(&self) -> Result<StageReport> {
        let mut report = StageReport::new("regressors");
        let matrix = load_indexed_design_matrix(self.config, &mut report)?;

        for participant in &self.plan.excluded_participants {
            report.skip_participant(&participant.label, "excluded by configuration");
        }
        for participant in &self.plan.participants {
            match self.process(participant, &matrix, &mut report) {
                Ok(outputs) => {
                    for output in outputs {
                        report.record_output(output);
                    }
                    report.finish_participant(&participant.label);
                }
                Err(e) if e.is_unit_local() => report.skip_participant(&participant.label, e.to_string()),
                Err(e) => return Err(e),
            }
        }

        report.log_summary();
        Ok(report)
    }

    fn process(
        &self,
        participant: &Participant,
        matrix: &DesignMatrix,
        report: &mut StageReport,
    ) -> Result<Vec<OutputFile>> {
        let parser = ExportedEventlistParser {
            header_lines: self.plan.skip.exported_header_lines,
            require_flags: false,
        };
        let exported = load(&parser, &self.plan.path(&self.plan.exported_eventlist, participant))?;
        report.absorb_malformed(exported.malformed);

        let columns = build_regressors(
            &exported.rows,
            matrix,
            self.plan.bin_scheme,
            &self.config.sentinels,
            report,
        );
        self.output.write_regressors(participant, &columns)
    }
}
