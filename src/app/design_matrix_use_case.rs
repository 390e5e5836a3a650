use std::path::PathBuf;
use tracing::{info, instrument};

use crate::app::ports::DesignMatrixOutputPort;
use crate::config::Config;
use crate::error::{PrepError, Result};
use crate::parser::features::MasterFeatureParser;
use crate::parser::load;
use crate::parser::prosody::{discover_annotation_files, AnnotationParser};
use crate::pipeline::design_matrix::build_design_matrix;
use crate::pipeline::StageReport;

/// Use case for building the word-level design matrix from the stimulus annotations
pub struct DesignMatrixUseCase<'a> {
    config: &'a Config,
    output: Box<dyn DesignMatrixOutputPort>,
}

impl<'a> DesignMatrixUseCase<'a> {
    pub fn new(config: &'a Config, output: Box<dyn DesignMatrixOutputPort>) -> Self {
        Self { config, output }
    }

    #[instrument(skip(self))]
    pub fn run(&self) -> Result<StageReport> {
        let stimuli = &self.config.stimuli;
        let mut report = StageReport::new("design-matrix");

        let roots: Vec<PathBuf> = stimuli.annotation_roots.iter().map(|r| stimuli.path(r)).collect();
        let files = discover_annotation_files(&roots, &stimuli.annotation_extension)?;
        if files.is_empty() {
            return Err(PrepError::Config(format!(
                "no '*{}' annotation files under {}",
                stimuli.annotation_extension,
                stimuli.root.display()
            )));
        }
        info!(files = files.len(), "Reading prosody annotations");

        let mut annotations = Vec::new();
        for file in &files {
            let parsed = load(&AnnotationParser, file)?;
            report.absorb_malformed(parsed.malformed);
            annotations.extend(parsed.rows);
        }

        let master = load(&MasterFeatureParser, &stimuli.path(&stimuli.master_features))?;
        report.absorb_malformed(master.malformed);

        let build = build_design_matrix(
            annotations,
            &master.rows,
            &stimuli.silence_token,
            self.config.joins.fail_on_ambiguous,
        )?;
        report.record_drop("silence_tokens", build.silence_rows);
        report.record_join(build.features_join);

        let output = self.output.write_design_matrix(&build.matrix)?;
        report.record_output(output);
        report.log_summary();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::fixtures::Fixture;
    use crate::manifest::OutputFile;
    use crate::pipeline::design_matrix::FEATURES_JOIN;
    use crate::pipeline::DesignMatrix;
    use crate::types::WordRecord;
    use std::sync::{Arc, Mutex};

    struct MockDesignMatrixOutput {
        pub rows: Arc<Mutex<Vec<WordRecord>>>,
    }

    impl MockDesignMatrixOutput {
        pub fn new() -> Self {
            Self {
                rows: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl DesignMatrixOutputPort for MockDesignMatrixOutput {
        fn write_design_matrix(&self, matrix: &DesignMatrix) -> Result<OutputFile> {
            self.rows.lock().unwrap().extend(matrix.rows().iter().cloned());
            Ok(OutputFile {
                path: "memory".to_string(),
                rows: matrix.len(),
                sha256: String::new(),
            })
        }
    }

    #[test]
    fn test_design_matrix_use_case() {
        let fixture = Fixture::new();
        let output = Box::new(MockDesignMatrixOutput::new());
        let rows_ref = output.rows.clone();

        let report = DesignMatrixUseCase::new(&fixture.config, output).run().unwrap();

        let rows = rows_ref.lock().unwrap();
        let words: Vec<&str> = rows.iter().map(|r| r.word.as_str()).collect();
        assert_eq!(words, vec!["the", "dog", "ran"]);
        assert_eq!(rows[1].bin_id_old, Some(11));
        assert_eq!(rows[2].features.surprisal.ngram, Some(7.0));
        assert_eq!(report.dropped("silence_tokens"), 1);
        assert_eq!(report.join(FEATURES_JOIN).unwrap().matched, 3);
        assert_eq!(report.rows_written(), 3);
    }

    #[test]
    fn missing_annotations_are_a_configuration_error() {
        let mut fixture = Fixture::new();
        fixture.config.stimuli.annotation_roots = vec![PathBuf::from("nowhere")];
        let err = DesignMatrixUseCase::new(&fixture.config, Box::new(MockDesignMatrixOutput::new()))
            .run()
            .unwrap_err();
        assert!(matches!(err, PrepError::Config(_)));
    }
}
