use tracing::{info, instrument};

use crate::app::load_indexed_design_matrix;
use crate::app::ports::EventlistOutputPort;
use crate::config::{Config, Participant, VariantPlan};
use crate::error::Result;
use crate::manifest::OutputFile;
use crate::parser::eventlist::HardwareEventlistParser;
use crate::parser::load;
use crate::parser::presentation::PresentationLogParser;
use crate::pipeline::timing::{reconstruct, SessionLog, TimingRules};
use crate::pipeline::{DesignMatrix, StageReport};

/// Use case for rebuilding word-level eventlists, one participant at a time
pub struct EventlistUseCase<'a> {
    config: &'a Config,
    plan: &'a VariantPlan,
    output: Box<dyn EventlistOutputPort>,
}

impl<'a> EventlistUseCase<'a> {
    pub fn new(config: &'a Config, plan: &'a VariantPlan, output: Box<dyn EventlistOutputPort>) -> Self {
        Self { config, plan, output }
    }

    #[instrument(skip(self), fields(variant = %self.plan.name))]
    pub fn run(&self) -> Result<StageReport> {
        let mut report = StageReport::new("eventlist");
        let matrix = load_indexed_design_matrix(self.config, &mut report)?;
        let rules = TimingRules::new(&self.config.markers, &self.config.joins, self.plan.bin_scheme);

        for participant in &self.plan.excluded_participants {
            report.skip_participant(&participant.label, "excluded by configuration");
        }
        for participant in &self.plan.participants {
            match self.process(participant, &matrix, &rules, &mut report) {
                Ok(output) => {
                    report.record_output(output);
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
        rules: &TimingRules<'_>,
        report: &mut StageReport,
    ) -> Result<OutputFile> {
        let skip = &self.plan.skip;
        let hardware_path = self.plan.path(&self.plan.hardware_eventlist, participant);
        let hardware = load(
            &HardwareEventlistParser {
                header_lines: skip.hardware_header_lines,
            },
            &hardware_path,
        )?;

        let log_parser = PresentationLogParser {
            header_lines: skip.presentation_header_lines,
            footer_lines: skip.presentation_footer_lines,
        };
        let mut logs = Vec::with_capacity(self.plan.presentation_logs.len());
        for template in &self.plan.presentation_logs {
            let path = self.plan.path(template, participant);
            let parsed = load(&log_parser, &path)?;
            report.absorb_malformed(parsed.malformed);
            logs.push(SessionLog {
                path,
                events: parsed.rows,
            });
        }
        report.absorb_malformed(hardware.malformed);

        let events = reconstruct(&hardware.rows, &hardware_path, &logs, matrix, rules, report)?;
        info!(participant = %participant.label, events = events.len(), "Writing corrected eventlist");
        self.output.write_eventlist(participant, &events)
    }
}
