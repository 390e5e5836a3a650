use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{body_lines, malformed, parse_f64, parse_opt_f64, parse_opt_integral, TableParser};
use crate::constants::ANNOTATION_FIELDS;
use crate::error::{PrepError, Result};
use crate::identifiers::PassageCode;
use crate::types::{AnnotationRow, Parsed};

/// Headerless prosody annotation, one file per stimulus passage
pub struct AnnotationParser;

impl TableParser for AnnotationParser {
    type Row = AnnotationRow;

    fn parse(&self, path: &Path, text: &str) -> Result<Parsed<AnnotationRow>> {
        let mut parsed = Parsed::default();
        for (line_no, line) in body_lines(text, 0, 0) {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != ANNOTATION_FIELDS {
                parsed.malformed.push(malformed(
                    path,
                    line_no,
                    format!("expected {} fields, got {}", ANNOTATION_FIELDS, fields.len()),
                ));
                continue;
            }
            match parse_annotation(&fields) {
                Ok(row) => parsed.rows.push(row),
                Err(reason) => parsed.malformed.push(malformed(path, line_no, reason)),
            }
        }
        Ok(parsed)
    }
}

fn parse_annotation(fields: &[&str]) -> std::result::Result<AnnotationRow, String> {
    let passage = PassageCode::parse(fields[0]).map_err(|e| e.to_string())?;
    Ok(AnnotationRow {
        sentence_id: fields[0].trim().to_string(),
        passage: passage.number,
        onset: parse_f64(fields[1])?,
        offset: parse_f64(fields[2])?,
        word: fields[3].trim().to_string(),
        prominence_value: parse_opt_f64(Some(fields[4]))?,
        boundary_value: parse_opt_f64(Some(fields[5]))?,
        prominence_label: parse_opt_integral(Some(fields[6]))?,
    })
}

/// Recursively collect files whose name ends with `extension`, in file-name order per root.
/// Roots are visited in the given order; a missing root is logged and skipped.
/// Symbolic links are not followed.
pub fn discover_annotation_files(roots: &[PathBuf], extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for root in roots {
        if !root.is_dir() {
            warn!(root = %root.display(), "Annotation root does not exist, skipping");
            continue;
        }
        let mut found = 0;
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root.as_path()).to_path_buf();
                PrepError::io(path, e.into())
            })?;
            let matches = entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|n| n.ends_with(extension));
            if matches {
                files.push(entry.into_path());
                found += 1;
            }
        }
        debug!(root = %root.display(), files = found, "Discovered annotation files");
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn parses_seven_column_rows() {
        let text = "12S\t0.10\t0.35\tthe\t0.2\t0.0\t1\n12S\t0.35\t0.60\t_SIL_\t\t\t\n12S\tbad\nS12\t0.6\t0.9\tcat\t\t\t\n";
        let parsed = AnnotationParser.parse(Path::new("12S.prom.disc"), text).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].word, "the");
        assert_eq!(parsed.rows[0].passage, 12);
        assert_eq!(parsed.rows[0].prominence_label, Some(1));
        assert_eq!(parsed.rows[1].prominence_value, None);
        assert_eq!(parsed.malformed.len(), 2);
    }

    #[test]
    fn discovery_is_recursive_and_ordered() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let nested = a.join("nested");
        fs::create_dir_all(&nested).unwrap();
        fs::write(a.join("2S.prom.disc"), "").unwrap();
        fs::write(a.join("1S.prom.disc"), "").unwrap();
        fs::write(nested.join("3G.prom.disc"), "").unwrap();
        fs::write(a.join("notes.txt"), "").unwrap();

        let files = discover_annotation_files(
            &[a.clone(), dir.path().join("missing")],
            ".prom.disc",
        )
        .unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["1S.prom.disc", "2S.prom.disc", "3G.prom.disc"]);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_walked() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("GestureAudio");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("12S.prom.disc"), "").unwrap();
        std::os::unix::fs::symlink(&root, root.join("loop")).unwrap();

        let files = discover_annotation_files(&[root.clone()], ".prom.disc").unwrap();
        assert_eq!(files, vec![root.join("12S.prom.disc")]);
    }
}
