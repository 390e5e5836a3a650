use csv::{Terminator, WriterBuilder};
use std::path::PathBuf;
use tracing::{info, warn};

use super::design_matrix_output_adapter::word_fields;
use super::create_output;
use crate::app::ports::ObservationOutputPort;
use crate::constants::{
    format_float,
    DESIGN_MATRIX_COLUMNS, OBSERVATION_LEAD_COLUMNS, OBSERVATION_TAIL_COLUMNS, ROW_INDEX_HEADER,
    SENTENCE_ORDER_COLUMN,
};
use crate::error::{PrepError, Result};
use crate::manifest::OutputFile;
use crate::types::ObservationRow;

/// Writes the observation table as one CSV with a leading row index
pub struct FileObservationOutputAdapter {
    path: PathBuf,
    drop_columns: Vec<String>,
}

impl FileObservationOutputAdapter {
    pub fn new(path: PathBuf, drop_columns: Vec<String>) -> Self {
        Self { path, drop_columns }
    }
}

fn header(extra_columns: &[String], include_sentence_order: bool) -> Vec<String> {
    let mut names: Vec<String> = OBSERVATION_LEAD_COLUMNS.iter().map(|c| c.to_string()).collect();
    // bin_id is already among the lead columns, in the recording's numbering
    names.extend(DESIGN_MATRIX_COLUMNS[1..].iter().map(|c| c.to_string()));
    names.extend(extra_columns.iter().cloned());
    names.extend(OBSERVATION_TAIL_COLUMNS.iter().map(|c| c.to_string()));
    if include_sentence_order {
        names.push(SENTENCE_ORDER_COLUMN.to_string());
    }
    names
}

fn row_fields(row: &ObservationRow, include_sentence_order: bool) -> Vec<String> {
    let m = &row.measurement;
    let mut fields = vec![
        format_float(m.amplitude),
        m.electrode.clone(),
        m.bin.to_string(),
        m.participant.clone(),
        format_float(m.baseline),
    ];
    fields.extend(word_fields(&row.word).into_iter().skip(1));
    fields.extend(row.word.extra.iter().cloned());
    fields.extend([
        format_float(row.coordinate.x),
        format_float(row.coordinate.y),
        format_float(row.coordinate.z),
        if row.clean { "True" } else { "False" }.to_string(),
    ]);
    if include_sentence_order {
        fields.push(row.sentence_order.map(|o| o.to_string()).unwrap_or_default());
    }
    fields
}

impl ObservationOutputPort for FileObservationOutputAdapter {
    fn write_observations(
        &self,
        rows: &[ObservationRow],
        extra_columns: &[String],
        include_sentence_order: bool,
    ) -> Result<OutputFile> {
        let names = header(extra_columns, include_sentence_order);
        for unknown in self.drop_columns.iter().filter(|c| !names.contains(c)) {
            warn!(column = %unknown, "Configured drop column is not in the observation table");
        }
        let keep: Vec<bool> = names.iter().map(|n| !self.drop_columns.contains(n)).collect();
        let select = |fields: Vec<String>| -> Vec<String> {
            fields
                .into_iter()
                .zip(&keep)
                .filter(|(_, keep)| **keep)
                .map(|(field, _)| field)
                .collect()
        };

        info!(path = %self.path.display(), rows = rows.len(), "Writing observation table");
        let mut writer = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .from_writer(create_output(&self.path)?);

        let mut head = vec![ROW_INDEX_HEADER.to_string()];
        head.extend(select(names));
        writer.write_record(&head)?;
        for (index, row) in rows.iter().enumerate() {
            let mut record = vec![index.to_string()];
            record.extend(select(row_fields(row, include_sentence_order)));
            writer.write_record(&record)?;
        }
        writer.flush().map_err(|e| PrepError::io(&self.path, e))?;
        drop(writer);

        OutputFile::describe(&self.path, rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ElectrodeCoordinate, Measurement, WordFeatures, WordRecord};
    use tempfile::tempdir;

    fn observation(bin: u32, sentence_order: Option<usize>) -> ObservationRow {
        ObservationRow {
            measurement: Measurement {
                participant: "part1".to_string(),
                electrode: "Cz".to_string(),
                bin,
                amplitude: 0.0,
                baseline: 1.2,
            },
            word: WordRecord {
                bin_id: bin,
                bin_id_old: Some(bin + 10),
                sentence_id: "12S".to_string(),
                word: "the".to_string(),
                onset: Some(0.0),
                offset: None,
                prominence_value: None,
                boundary_value: None,
                prominence_label: Some(1),
                features: WordFeatures::default(),
                extra: vec!["1".to_string(), "left".to_string()],
            },
            coordinate: ElectrodeCoordinate {
                label: "Cz".to_string(),
                x: 0.0,
                y: -0.5,
                z: 1.0,
            },
            clean: true,
            sentence_order,
        }
    }

    fn read_table(path: &std::path::Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new().has_headers(false).from_path(path).unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(|f| f.to_string()).collect())
            .collect()
    }

    #[test]
    fn leading_index_and_dropped_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lmer/300-500_info.csv");
        let adapter = FileObservationOutputAdapter::new(
            path.clone(),
            vec!["beat_gesture_prev".to_string(), "lemma".to_string()],
        );
        let extras = vec!["beat_gesture_prev".to_string(), "gaze".to_string()];
        adapter
            .write_observations(&[observation(0, Some(0)), observation(1, Some(2))], &extras, true)
            .unwrap();

        let table = read_table(&path);
        let head = &table[0];
        assert_eq!(head[0], "");
        assert_eq!(&head[1..6], &["ERP", "electrode", "bin_id", "part_id", "baseline"]);
        assert!(!head.contains(&"beat_gesture_prev".to_string()));
        assert!(!head.contains(&"lemma".to_string()));
        assert!(head.contains(&"gaze".to_string()));
        assert_eq!(head.last().unwrap(), "sentence_order");
        assert!(table.iter().all(|r| r.len() == head.len()));

        let second = &table[2];
        assert_eq!(second[0], "1");
        assert_eq!(second[1], "0.0");
        assert_eq!(second[5], "1.2");
        assert_eq!(second.last().unwrap(), "2");
        let gaze = head.iter().position(|h| h == "gaze").unwrap();
        assert_eq!(second[gaze], "left");
    }

    #[test]
    fn sentence_order_column_is_optional() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        FileObservationOutputAdapter::new(path.clone(), Vec::new())
            .write_observations(&[observation(0, None)], &[], false)
            .unwrap();

        let table = read_table(&path);
        assert_eq!(table[0].last().unwrap(), "ar_good");
        assert_eq!(table[1].last().unwrap(), "True");
    }
}
