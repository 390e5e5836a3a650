use tracing::{info, instrument};

use crate::app::load_indexed_design_matrix;
use crate::app::ports::ObservationOutputPort;
use crate::config::{Config, VariantPlan};
use crate::error::Result;
use crate::parser::eventlist::ExportedEventlistParser;
use crate::parser::load;
use crate::parser::measurements::{ElectrodeParser, MeasurementParser};
use crate::pipeline::assemble::{artifact_records, assemble, ArtifactTable, AssemblyRules};
use crate::pipeline::{DesignMatrix, StageReport};

/// Use case for assembling the per-observation analysis table of a variant
pub struct AssembleUseCase<'a> {
    config: &'a Config,
    plan: &'a VariantPlan,
    output: Box<dyn ObservationOutputPort>,
}

impl<'a> AssembleUseCase<'a> {
    pub fn new(config: &'a Config, plan: &'a VariantPlan, output: Box<dyn ObservationOutputPort>) -> Self {
        Self { config, plan, output }
    }

    #[instrument(skip(self), fields(variant = %self.plan.name))]
    pub fn run(&self) -> Result<StageReport> {
        let mut report = StageReport::new("assemble");
        let matrix = load_indexed_design_matrix(self.config, &mut report)?;

        let amplitude = load(&MeasurementParser, &self.plan.amplitude_table)?;
        report.absorb_malformed(amplitude.malformed);
        let baseline = load(&MeasurementParser, &self.plan.baseline_table)?;
        report.absorb_malformed(baseline.malformed);
        let stimuli = &self.config.stimuli;
        let electrodes = load(&ElectrodeParser, &stimuli.path(&stimuli.electrode_coordinates))?;
        report.absorb_malformed(electrodes.malformed);

        for participant in &self.plan.excluded_participants {
            report.skip_participant(&participant.label, "excluded by configuration");
        }
        let artifacts = if self.plan.capabilities.needs_rejection_eventlist() {
            Some(self.load_artifacts(&matrix, &mut report)?)
        } else {
            info!("Variant has no rejection eventlists; every observation counts as clean");
            for participant in &self.plan.participants {
                report.finish_participant(&participant.label);
            }
            None
        };

        let rules = AssemblyRules::from_plan(self.plan, &self.config.joins);
        let rows = assemble(
            &amplitude.rows,
            &baseline.rows,
            &matrix,
            &electrodes.rows,
            artifacts.as_ref(),
            &rules,
            &mut report,
        )?;

        let output = self
            .output
            .write_observations(&rows, matrix.extra_columns(), self.plan.capabilities.sentence_order)?;
        report.record_output(output);
        report.log_summary();
        Ok(report)
    }

    fn load_artifacts(&self, matrix: &DesignMatrix, report: &mut StageReport) -> Result<ArtifactTable> {
        let parser = ExportedEventlistParser {
            header_lines: self.plan.skip.exported_header_lines,
            require_flags: self.plan.capabilities.artifact_rejection,
        };
        let mut table = ArtifactTable::default();
        for participant in &self.plan.participants {
            let path = self.plan.path(&self.plan.rejection_eventlist, participant);
            match load(&parser, &path) {
                Ok(parsed) => {
                    report.absorb_malformed(parsed.malformed);
                    table.records.extend(artifact_records(
                        &participant.label,
                        &parsed.rows,
                        matrix,
                        self.plan.bin_scheme,
                        self.plan.capabilities,
                        report,
                    ));
                    report.finish_participant(&participant.label);
                }
                Err(e) if e.is_unit_local() => {
                    report.skip_participant(&participant.label, e.to_string());
                    table.missing.insert(participant.label.clone());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::fixtures::Fixture;
    use crate::config::Capabilities;
    use crate::manifest::OutputFile;
    use crate::pipeline::assemble::ARTIFACT_JOIN;
    use crate::types::ObservationRow;
    use std::sync::{Arc, Mutex};

    struct MockObservationOutput {
        pub rows: Arc<Mutex<Vec<ObservationRow>>>,
        pub sentence_order: Arc<Mutex<Option<bool>>>,
    }

    impl MockObservationOutput {
        pub fn new() -> Self {
            Self {
                rows: Arc::new(Mutex::new(Vec::new())),
                sentence_order: Arc::new(Mutex::new(None)),
            }
        }
    }

    impl ObservationOutputPort for MockObservationOutput {
        fn write_observations(
            &self,
            rows: &[ObservationRow],
            _extra_columns: &[String],
            include_sentence_order: bool,
        ) -> Result<OutputFile> {
            self.rows.lock().unwrap().extend(rows.iter().cloned());
            *self.sentence_order.lock().unwrap() = Some(include_sentence_order);
            Ok(OutputFile {
                path: "memory".to_string(),
                rows: rows.len(),
                sha256: String::new(),
            })
        }
    }

    #[test]
    fn test_assemble_use_case() {
        let fixture = Fixture::new();
        let plan = fixture.plan();
        let output = Box::new(MockObservationOutput::new());
        let rows_ref = output.rows.clone();
        let order_ref = output.sentence_order.clone();

        let report = AssembleUseCase::new(&fixture.config, &plan, output).run().unwrap();

        let rows = rows_ref.lock().unwrap();
        assert_eq!(rows.len(), 2);
        // Zero amplitude with a nonzero baseline is a real observation
        assert_eq!(rows[1].measurement.amplitude, 0.0);
        assert_eq!(rows[1].measurement.baseline, 1.2);
        assert!(rows[0].clean);
        assert!(!rows[1].clean);
        assert_eq!(rows[0].sentence_order, Some(0));
        assert_eq!(rows[0].coordinate.z, 1.0);
        assert_eq!(*order_ref.lock().unwrap(), Some(true));
        assert_eq!(report.dropped("zero_sentinel"), 1);
        assert!(report.join(ARTIFACT_JOIN).unwrap().is_clean());
        assert_eq!(report.participants_skipped[0].participant, "part2");
    }

    #[test]
    fn variant_without_capabilities_skips_eventlists() {
        let mut fixture = Fixture::new();
        fixture.config.variants.get_mut("audio").unwrap().capabilities = Capabilities::default();
        std::fs::remove_file(
            fixture
                .root()
                .join("data/eventlist/export_ar/eventlist_export_AR_part1.txt"),
        )
        .unwrap();
        let plan = fixture.plan();
        let output = Box::new(MockObservationOutput::new());
        let rows_ref = output.rows.clone();
        let order_ref = output.sentence_order.clone();

        let report = AssembleUseCase::new(&fixture.config, &plan, output).run().unwrap();

        let rows = rows_ref.lock().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.clean && r.sentence_order.is_none()));
        assert_eq!(*order_ref.lock().unwrap(), Some(false));
        assert!(report.join(ARTIFACT_JOIN).is_none());
    }
}
