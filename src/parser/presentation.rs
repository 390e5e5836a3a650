use std::path::Path;

use super::{body_lines, malformed, HeaderIndex, TableParser};
use crate::constants::{PRESENTATION_CODE, PRESENTATION_EVENT_TYPE};
use crate::error::{PrepError, Result};
use crate::types::{Parsed, PresentationEvent};

/// Presentation logfile; scenario info surrounds the event table
pub struct PresentationLogParser {
    pub header_lines: usize,
    pub footer_lines: usize,
}

impl TableParser for PresentationLogParser {
    type Row = PresentationEvent;

    fn parse(&self, path: &Path, text: &str) -> Result<Parsed<PresentationEvent>> {
        let mut lines = body_lines(text, self.header_lines, self.footer_lines).into_iter();
        let (_, header_line) = lines.next().ok_or_else(|| PrepError::Malformed {
            path: path.to_path_buf(),
            reason: "no event table between header and footer".to_string(),
        })?;
        let header = HeaderIndex::from_tab_line(header_line);
        let type_col = header.require_name(PRESENTATION_EVENT_TYPE, path)?;
        let code_col = header.require_name(PRESENTATION_CODE, path)?;

        let mut parsed = Parsed::default();
        for (line_no, line) in lines {
            let fields: Vec<&str> = line.split('\t').collect();
            match (fields.get(type_col), fields.get(code_col)) {
                (Some(event_type), Some(code)) => parsed.rows.push(PresentationEvent {
                    line: line_no,
                    event_type: event_type.trim().to_string(),
                    code: code.trim().to_string(),
                }),
                _ => parsed.malformed.push(malformed(
                    path,
                    line_no,
                    format!("expected at least {} fields, got {}", type_col.max(code_col) + 1, fields.len()),
                )),
            }
        }
        Ok(parsed)
    }
}
