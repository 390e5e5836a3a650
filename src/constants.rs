/// Fixed column names and placeholder values shared with external tooling.
/// These are wire-format contracts, kept apart from the transformation code.

/// A source column whose literal header text carries whitespace padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceColumn {
    /// Header text exactly as written by the exporting tool
    pub literal: &'static str,
    /// Name used everywhere inside this crate
    pub canonical: &'static str,
}

impl SourceColumn {
    pub const fn new(literal: &'static str, canonical: &'static str) -> Self {
        Self { literal, canonical }
    }

    /// Exact literal match first, then a whitespace-insensitive match.
    pub fn matches(&self, header: &str) -> bool {
        header == self.literal || header.trim() == self.literal.trim()
    }
}

/// Layout of an ERPLAB text eventlist, as parsed by the EEG toolchain.
#[derive(Debug)]
pub struct EventlistLayout {
    pub header: [&'static str; 11],
    pub onset: SourceColumn,
    pub ecode: SourceColumn,
    pub epoch: &'static str,
    pub label: &'static str,
    pub duration: &'static str,
    pub flags: &'static str,
    pub enable: &'static str,
    pub bin_list_open: &'static str,
    pub bin_list_close: &'static str,
    pub undefined_delta: &'static str,
}

pub const EVENTLIST: EventlistLayout = EventlistLayout {
    header: [
        "item",
        "bepoch",
        "  ecode",
        "label",
        "      onset",
        "diff",
        "dura",
        "b_flags",
        "a_flags",
        "enable",
        "bin",
    ],
    onset: SourceColumn::new("      onset", "onset"),
    ecode: SourceColumn::new("  ecode", "ecode"),
    epoch: "0.0",
    label: "\"\"",
    duration: "0.0",
    flags: "00000000     00000000",
    enable: "1.0",
    bin_list_open: "[    ",
    bin_list_close: "]",
    undefined_delta: "NaN",
};

/// Headerless eventlist export written by ERPLAB after binning/artifact rejection.
#[derive(Debug)]
pub struct ExportedEventlistLayout {
    pub bin_column: usize,
    pub flags_column: usize,
    /// Rejection bitstring of an accepted event, padding included
    pub clean_flags: &'static str,
}

pub const EXPORTED_EVENTLIST: ExportedEventlistLayout = ExportedEventlistLayout {
    bin_column: 2,
    flags_column: 7,
    clean_flags: "    00000000     00000000",
};

/// Columns of the Presentation logfile that carry stimulus playback.
pub const PRESENTATION_EVENT_TYPE: &str = "Event Type";
pub const PRESENTATION_CODE: &str = "Code";

/// ERP measurement export (amplitude or baseline window).
pub const MEASUREMENT_VALUE: SourceColumn = SourceColumn::new("       value", "value");
pub const MEASUREMENT_CHANNEL: SourceColumn = SourceColumn::new("     chlabel", "electrode");
pub const MEASUREMENT_BIN: SourceColumn = SourceColumn::new("        bini", "bin_id");
pub const MEASUREMENT_ERPSET: SourceColumn = SourceColumn::new("ERPset", "part_id");

/// Column count of one prosody annotation (`.prom.disc`) line.
pub const ANNOTATION_FIELDS: usize = 7;

/// Design-matrix columns, in output order. Extra passthrough columns follow.
pub const DESIGN_MATRIX_COLUMNS: [&str; 22] = [
    "bin_id",
    "bin_id_old",
    "sentence_id",
    "word",
    "onset",
    "offset",
    "prominence_value",
    "boundary_value",
    "prominence_label",
    "word_sequence",
    "max_f0",
    "min_f0",
    "mean_f0",
    "mean_intensity",
    "frequency",
    "pos_binary",
    "pos_detail",
    "lemma",
    "word_length",
    "surprisal_ngram",
    "surprisal_gpt",
    "surprisal_bert",
];

/// Master feature table headers as exported by the earlier norming study.
pub mod master {
    pub const WORD_SEQUENCE: &str = "WordID";
    pub const SENTENCE_NUMBER: &str = "SentenceID";
    pub const SENTENCE_TAG: &str = "Unnamed: 3";
    pub const SENTENCE_ID: &str = "sentence_id";
    pub const WORD: &str = "word";
    pub const BIN_ID: &str = "bin_id";
    pub const MAX_F0: &str = "maxf0";
    pub const MIN_F0: &str = "minf0";
    pub const MEAN_F0: &str = "meanf0";
    pub const MEAN_INTENSITY: &str = "meanIntensity";
    pub const FREQUENCY: &str = "FrequencyNew";
    pub const POS_BINARY: &str = "POSBinary";
    pub const POS_DETAIL: &str = "POSDetail";
    pub const LEMMA: &str = "lemma";
    pub const WORD_LENGTH: &str = "wdLen";
    pub const SURPRISAL_NGRAM: [&str; 2] = ["surprisal_ngram", "SurprisalFull"];
    pub const SURPRISAL_GPT: &str = "surprisal_gpt";
    pub const SURPRISAL_BERT: &str = "surprisal_bert";
}

/// Leading observation-table columns; design-matrix columns follow, then coordinates.
pub const ROW_INDEX_HEADER: &str = "";
pub const OBSERVATION_LEAD_COLUMNS: [&str; 5] = ["ERP", "electrode", "bin_id", "part_id", "baseline"];
pub const OBSERVATION_TAIL_COLUMNS: [&str; 4] = ["x", "y", "z", "ar_good"];
pub const SENTENCE_ORDER_COLUMN: &str = "sentence_order";

/// Literal written for a missing value in headerless regressor files.
pub const REGRESSOR_MISSING: &str = "NaN";

/// Format a float the way the downstream readers expect: integral values keep one decimal.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return REGRESSOR_MISSING.to_string();
    }
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}
