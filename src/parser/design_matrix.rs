use csv::{ReaderBuilder, StringRecord};
use std::path::Path;

use super::{malformed, opt_text, parse_id, parse_opt_f64, parse_opt_id, parse_opt_integral, read_source, CsvColumns};
use crate::constants::DESIGN_MATRIX_COLUMNS;
use crate::error::{PrepError, Result};
use crate::types::{Parsed, Surprisal, WordFeatures, WordRecord};

/// Design matrix as read back from disk, with columns outside the known schema kept verbatim
#[derive(Debug, Clone, Default)]
pub struct DesignMatrixFile {
    pub extra_columns: Vec<String>,
    pub parsed: Parsed<WordRecord>,
}

const REQUIRED: [&str; 3] = ["bin_id", "sentence_id", "word"];

pub fn load_design_matrix(path: &Path) -> Result<DesignMatrixFile> {
    let text = read_source(path)?;
    parse_design_matrix(path, &text)
}

pub fn parse_design_matrix(path: &Path, text: &str) -> Result<DesignMatrixFile> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();
    let columns = CsvColumns::new(&headers);
    for name in REQUIRED {
        if !columns.has(name) {
            return Err(PrepError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            });
        }
    }

    // Unnamed leading index columns from spreadsheet exports are not carried along
    let extra: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| {
            let h = h.trim();
            !h.is_empty() && !h.starts_with("Unnamed: ") && !DESIGN_MATRIX_COLUMNS.contains(&h)
        })
        .map(|(i, h)| (i, h.trim().to_string()))
        .collect();

    let mut file = DesignMatrixFile {
        extra_columns: extra.iter().map(|(_, h)| h.clone()).collect(),
        parsed: Parsed::default(),
    };
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        match parse_word(&columns, headers.len(), &record, &extra) {
            Ok(word) => file.parsed.rows.push(word),
            Err(reason) => file.parsed.malformed.push(malformed(path, line, reason)),
        }
    }
    Ok(file)
}

fn parse_word(
    columns: &CsvColumns,
    width: usize,
    record: &StringRecord,
    extra: &[(usize, String)],
) -> std::result::Result<WordRecord, String> {
    if record.len() != width {
        return Err(format!("expected {} fields, got {}", width, record.len()));
    }
    let get = |name: &str| columns.get(record, name);
    let bin_id = parse_id(get("bin_id").unwrap_or_default())?;

    Ok(WordRecord {
        bin_id,
        bin_id_old: parse_opt_id(get("bin_id_old"))?,
        sentence_id: opt_text(get("sentence_id")).ok_or("missing sentence_id")?,
        word: get("word").unwrap_or_default().trim().to_string(),
        onset: parse_opt_f64(get("onset"))?,
        offset: parse_opt_f64(get("offset"))?,
        prominence_value: parse_opt_f64(get("prominence_value"))?,
        boundary_value: parse_opt_f64(get("boundary_value"))?,
        prominence_label: parse_opt_integral(get("prominence_label"))?,
        features: WordFeatures {
            word_sequence: parse_opt_id(get("word_sequence"))?,
            max_f0: parse_opt_f64(get("max_f0"))?,
            min_f0: parse_opt_f64(get("min_f0"))?,
            mean_f0: parse_opt_f64(get("mean_f0"))?,
            mean_intensity: parse_opt_f64(get("mean_intensity"))?,
            frequency: parse_opt_f64(get("frequency"))?,
            pos_binary: parse_opt_integral(get("pos_binary"))?,
            pos_detail: opt_text(get("pos_detail")),
            lemma: opt_text(get("lemma")),
            word_length: parse_opt_id(get("word_length"))?,
            surprisal: Surprisal {
                ngram: parse_opt_f64(get("surprisal_ngram"))?,
                gpt: parse_opt_f64(get("surprisal_gpt"))?,
                bert: parse_opt_f64(get("surprisal_bert"))?,
            },
        },
        extra: extra
            .iter()
            .map(|(i, _)| record.get(*i).unwrap_or_default().to_string())
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_unknown_columns_as_passthrough() {
        let text = ",bin_id,sentence_id,word,onset,pos_binary,beat_gesture_prev\n\
                    0,0,1S,the,0.1,0.0,1\n\
                    1,1,1S,dog,,1,0\n";
        let file = parse_design_matrix(Path::new("dm.csv"), text).unwrap();
        assert_eq!(file.extra_columns, vec!["beat_gesture_prev"]);
        assert_eq!(file.parsed.rows.len(), 2);
        assert_eq!(file.parsed.rows[0].features.pos_binary, Some(0));
        assert_eq!(file.parsed.rows[0].extra, vec!["1"]);
        assert_eq!(file.parsed.rows[1].onset, None);
    }

    #[test]
    fn requires_canonical_key_columns() {
        let err = parse_design_matrix(Path::new("dm.csv"), "sentence_id,word\n1S,the\n").unwrap_err();
        assert!(matches!(err, PrepError::MissingColumn { ref column, .. } if column == "bin_id"));
    }

    #[test]
    fn bad_bin_is_malformed() {
        let file = parse_design_matrix(Path::new("dm.csv"), "bin_id,sentence_id,word\nx,1S,the\n").unwrap();
        assert!(file.parsed.rows.is_empty());
        assert_eq!(file.parsed.malformed.len(), 1);
    }

    #[test]
    fn ragged_row_is_skipped() {
        let text = "bin_id,sentence_id,word\n0,1S,the\n1,1S\n2,1S,cat\n";
        let file = parse_design_matrix(Path::new("dm.csv"), text).unwrap();
        let bins: Vec<u32> = file.parsed.rows.iter().map(|w| w.bin_id).collect();
        assert_eq!(bins, vec![0, 2]);
        assert_eq!(file.parsed.malformed.len(), 1);
        assert_eq!(file.parsed.malformed[0].line, 3);
    }
}
