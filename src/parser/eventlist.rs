use std::path::Path;

use super::{body_lines, malformed, parse_f64, parse_id, parse_integral, HeaderIndex, TableParser};
use crate::constants::{EVENTLIST, EXPORTED_EVENTLIST};
use crate::error::{PrepError, Result};
use crate::types::{ExportedEvent, HardwareEvent, Parsed};

/// Eventlist written by the acquisition software: one row per trigger pulse
pub struct HardwareEventlistParser {
    pub header_lines: usize,
}

impl TableParser for HardwareEventlistParser {
    type Row = HardwareEvent;

    fn parse(&self, path: &Path, text: &str) -> Result<Parsed<HardwareEvent>> {
        let mut lines = body_lines(text, self.header_lines, 0).into_iter();
        let (_, header_line) = lines.next().ok_or_else(|| PrepError::Malformed {
            path: path.to_path_buf(),
            reason: format!("no column header after {} header lines", self.header_lines),
        })?;
        let header = HeaderIndex::from_tab_line(header_line);
        let onset_col = header.require(&EVENTLIST.onset, path)?;
        let code_col = header.require(&EVENTLIST.ecode, path)?;

        let mut parsed = Parsed::default();
        for (line_no, line) in lines {
            let fields: Vec<&str> = line.split('\t').collect();
            let (Some(onset), Some(code)) = (fields.get(onset_col), fields.get(code_col)) else {
                parsed.malformed.push(malformed(
                    path,
                    line_no,
                    format!("expected at least {} fields, got {}", onset_col.max(code_col) + 1, fields.len()),
                ));
                continue;
            };
            match (parse_f64(onset), parse_integral(code)) {
                (Ok(onset), Ok(code)) => parsed.rows.push(HardwareEvent {
                    line: line_no,
                    onset,
                    code,
                }),
                (Err(reason), _) | (_, Err(reason)) => {
                    parsed.malformed.push(malformed(path, line_no, reason));
                }
            }
        }
        Ok(parsed)
    }
}

/// Headerless eventlist export; positional bin and rejection-flag columns
pub struct ExportedEventlistParser {
    pub header_lines: usize,
    /// Whether the rejection bitstring column must be present
    pub require_flags: bool,
}

impl TableParser for ExportedEventlistParser {
    type Row = ExportedEvent;

    fn parse(&self, path: &Path, text: &str) -> Result<Parsed<ExportedEvent>> {
        let mut parsed = Parsed::default();
        for (line_no, line) in body_lines(text, self.header_lines, 0) {
            let fields: Vec<&str> = line.split('\t').collect();
            let Some(bin_field) = fields.get(EXPORTED_EVENTLIST.bin_column) else {
                parsed.malformed.push(malformed(
                    path,
                    line_no,
                    format!("missing bin column {}", EXPORTED_EVENTLIST.bin_column),
                ));
                continue;
            };
            let flags = fields
                .get(EXPORTED_EVENTLIST.flags_column)
                .map(|f| f.to_string());
            if self.require_flags && flags.is_none() {
                parsed.malformed.push(malformed(
                    path,
                    line_no,
                    format!("missing rejection flags column {}", EXPORTED_EVENTLIST.flags_column),
                ));
                continue;
            }
            match parse_id(bin_field) {
                Ok(bin) => parsed.rows.push(ExportedEvent {
                    line: line_no,
                    bin,
                    flags,
                }),
                Err(reason) => parsed.malformed.push(malformed(path, line_no, reason)),
            }
        }
        Ok(parsed)
    }
}
