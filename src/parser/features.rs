use csv::{ReaderBuilder, StringRecord};
use std::path::Path;

use super::{malformed, opt_text, parse_opt_f64, parse_opt_id, parse_opt_integral, CsvColumns, TableParser};
use crate::constants::master;
use crate::error::{PrepError, Result};
use crate::types::{MasterFeatureRow, Parsed, Surprisal, WordFeatures};

/// Master linguistic-feature table, keyed by (sentence id, word)
pub struct MasterFeatureParser;

impl TableParser for MasterFeatureParser {
    type Row = MasterFeatureRow;

    fn parse(&self, path: &Path, text: &str) -> Result<Parsed<MasterFeatureRow>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());
        let columns = CsvColumns::new(reader.headers()?);
        if !columns.has(master::WORD) {
            return Err(PrepError::MissingColumn {
                path: path.to_path_buf(),
                column: master::WORD.to_string(),
            });
        }
        if !columns.has(master::SENTENCE_ID) && !columns.has(master::SENTENCE_NUMBER) {
            return Err(PrepError::MissingColumn {
                path: path.to_path_buf(),
                column: master::SENTENCE_NUMBER.to_string(),
            });
        }

        let mut parsed = Parsed::default();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
            match parse_master_row(&columns, &record) {
                Ok(row) => parsed.rows.push(row),
                Err(reason) => parsed.malformed.push(malformed(path, line, reason)),
            }
        }
        Ok(parsed)
    }
}

/// Sentence ids are split across a number column and an unnamed tag column in the older export
fn sentence_id(columns: &CsvColumns, record: &StringRecord) -> std::result::Result<String, String> {
    if let Some(id) = opt_text(columns.get(record, master::SENTENCE_ID)) {
        return Ok(id);
    }
    let number = opt_text(columns.get(record, master::SENTENCE_NUMBER))
        .ok_or_else(|| "missing sentence id".to_string())?;
    // Integral sentence numbers may have been written as floats
    let number = number.strip_suffix(".0").unwrap_or(&number).to_string();
    let tag = opt_text(columns.get(record, master::SENTENCE_TAG)).unwrap_or_default();
    Ok(format!("{}{}", number, tag))
}

fn parse_master_row(columns: &CsvColumns, record: &StringRecord) -> std::result::Result<MasterFeatureRow, String> {
    let word = opt_text(columns.get(record, master::WORD)).ok_or_else(|| "missing word".to_string())?;
    let get = |name: &str| columns.get(record, name);

    Ok(MasterFeatureRow {
        sentence_id: sentence_id(columns, record)?,
        word,
        bin_id_old: parse_opt_id(get(master::BIN_ID))?,
        features: WordFeatures {
            word_sequence: parse_opt_id(get(master::WORD_SEQUENCE))?,
            max_f0: parse_opt_f64(get(master::MAX_F0))?,
            min_f0: parse_opt_f64(get(master::MIN_F0))?,
            mean_f0: parse_opt_f64(get(master::MEAN_F0))?,
            mean_intensity: parse_opt_f64(get(master::MEAN_INTENSITY))?,
            frequency: parse_opt_f64(get(master::FREQUENCY))?,
            pos_binary: parse_opt_integral(get(master::POS_BINARY))?,
            pos_detail: opt_text(get(master::POS_DETAIL)),
            lemma: opt_text(get(master::LEMMA)),
            word_length: parse_opt_id(get(master::WORD_LENGTH))?,
            surprisal: Surprisal {
                ngram: parse_opt_f64(columns.get_any(record, &master::SURPRISAL_NGRAM))?,
                gpt: parse_opt_f64(get(master::SURPRISAL_GPT))?,
                bert: parse_opt_f64(get(master::SURPRISAL_BERT))?,
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_sentence_number_and_tag() {
        let text = "WordID,SentenceID,Unnamed: 3,word,bin_id,POSBinary,SurprisalFull,surprisal_gpt\n\
                    1,12,S,the,40,0,2.5,3.1\n\
                    2,12.0,S,dog,41,1,,4.0\n";
        let parsed = MasterFeatureParser.parse(Path::new("m.csv"), text).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        let first = &parsed.rows[0];
        assert_eq!(first.sentence_id, "12S");
        assert_eq!(first.bin_id_old, Some(40));
        assert_eq!(first.features.pos_binary, Some(0));
        assert_eq!(first.features.surprisal.ngram, Some(2.5));
        assert_eq!(parsed.rows[1].sentence_id, "12S");
        assert_eq!(parsed.rows[1].features.surprisal.ngram, None);
        assert_eq!(parsed.rows[1].features.surprisal.gpt, Some(4.0));
    }

    #[test]
    fn explicit_sentence_id_column_wins() {
        let text = "sentence_id,word,surprisal_ngram\n7G,cat,1.5\n";
        let parsed = MasterFeatureParser.parse(Path::new("m.csv"), text).unwrap();
        assert_eq!(parsed.rows[0].sentence_id, "7G");
        assert_eq!(parsed.rows[0].features.surprisal.ngram, Some(1.5));
    }

    #[test]
    fn bad_numbers_are_malformed_rows() {
        let text = "sentence_id,word,maxf0\n7G,cat,high\n7G,dog,210.5\n";
        let parsed = MasterFeatureParser.parse(Path::new("m.csv"), text).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.malformed.len(), 1);
        assert_eq!(parsed.malformed[0].line, 2);
    }
}
