use csv::ReaderBuilder;
use std::path::Path;

use super::{malformed, parse_f64, parse_id, HeaderIndex, TableParser};
use crate::constants::{MEASUREMENT_BIN, MEASUREMENT_CHANNEL, MEASUREMENT_ERPSET, MEASUREMENT_VALUE};
use crate::error::Result;
use crate::types::{ElectrodeCoordinate, MeasurementRow, Parsed};

/// Long-format ERP measurement export (one value per participant, channel and bin)
pub struct MeasurementParser;

impl TableParser for MeasurementParser {
    type Row = MeasurementRow;

    fn parse(&self, path: &Path, text: &str) -> Result<Parsed<MeasurementRow>> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());
        let header = HeaderIndex::from_record(reader.headers()?);
        let value_col = header.require(&MEASUREMENT_VALUE, path)?;
        let channel_col = header.require(&MEASUREMENT_CHANNEL, path)?;
        let bin_col = header.require(&MEASUREMENT_BIN, path)?;
        let erpset_col = header.require(&MEASUREMENT_ERPSET, path)?;

        let mut parsed = Parsed::default();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
            let fields = (
                record.get(value_col),
                record.get(channel_col),
                record.get(bin_col),
                record.get(erpset_col),
            );
            let (Some(value), Some(channel), Some(bin), Some(erpset)) = fields else {
                parsed
                    .malformed
                    .push(malformed(path, line, format!("short row with {} fields", record.len())));
                continue;
            };
            match (parse_f64(value), parse_id(bin)) {
                (Ok(value), Ok(bin)) => parsed.rows.push(MeasurementRow {
                    participant: erpset.trim().to_string(),
                    electrode: channel.trim().to_string(),
                    bin,
                    value,
                }),
                (Err(reason), _) | (_, Err(reason)) => parsed.malformed.push(malformed(path, line, reason)),
            }
        }
        Ok(parsed)
    }
}

/// Channel coordinate table: label, x, y, z by position; header names are ignored
pub struct ElectrodeParser;

impl TableParser for ElectrodeParser {
    type Row = ElectrodeCoordinate;

    fn parse(&self, path: &Path, text: &str) -> Result<Parsed<ElectrodeCoordinate>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut parsed = Parsed::default();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
            if record.len() < 4 {
                parsed
                    .malformed
                    .push(malformed(path, line, format!("expected 4 fields, got {}", record.len())));
                continue;
            }
            let coords = (parse_f64(&record[1]), parse_f64(&record[2]), parse_f64(&record[3]));
            match coords {
                (Ok(x), Ok(y), Ok(z)) => parsed.rows.push(ElectrodeCoordinate {
                    label: record[0].trim().to_string(),
                    x,
                    y,
                    z,
                }),
                (Err(reason), _, _) | (_, Err(reason), _) | (_, _, Err(reason)) => {
                    parsed.malformed.push(malformed(path, line, reason))
                }
            }
        }
        Ok(parsed)
    }
}
