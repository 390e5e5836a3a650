use serde::{Deserialize, Serialize};

/// One line of a prosody annotation file
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRow {
    pub sentence_id: String,
    /// Numeric passage key of `sentence_id`
    pub passage: u32,
    pub onset: f64,
    pub offset: f64,
    pub word: String,
    pub prominence_value: Option<f64>,
    pub boundary_value: Option<f64>,
    pub prominence_label: Option<i64>,
}

/// Surprisal estimates for one word, one per estimator
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Surprisal {
    pub ngram: Option<f64>,
    pub gpt: Option<f64>,
    pub bert: Option<f64>,
}

/// Acoustic and lexical features attached from the master feature table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordFeatures {
    pub word_sequence: Option<u32>,
    pub max_f0: Option<f64>,
    pub min_f0: Option<f64>,
    pub mean_f0: Option<f64>,
    pub mean_intensity: Option<f64>,
    pub frequency: Option<f64>,
    pub pos_binary: Option<i64>,
    pub pos_detail: Option<String>,
    pub lemma: Option<String>,
    pub word_length: Option<u32>,
    pub surprisal: Surprisal,
}

/// One row of the master feature table, keyed by (sentence id, word)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MasterFeatureRow {
    pub sentence_id: String,
    pub word: String,
    pub bin_id_old: Option<u32>,
    pub features: WordFeatures,
}

/// Canonical per-word design-matrix row
#[derive(Debug, Clone, PartialEq)]
pub struct WordRecord {
    /// Canonical ("new") bin id
    pub bin_id: u32,
    pub bin_id_old: Option<u32>,
    pub sentence_id: String,
    pub word: String,
    /// Seconds relative to passage onset
    pub onset: Option<f64>,
    pub offset: Option<f64>,
    pub prominence_value: Option<f64>,
    pub boundary_value: Option<f64>,
    pub prominence_label: Option<i64>,
    pub features: WordFeatures,
    /// Passthrough values for columns outside the known schema, aligned with the table's extra headers
    pub extra: Vec<String>,
}

/// Trigger recorded by the acquisition hardware
#[derive(Debug, Clone, PartialEq)]
pub struct HardwareEvent {
    pub line: usize,
    /// Seconds from recording start
    pub onset: f64,
    pub code: i64,
}

/// Playback event from the Presentation logfile
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationEvent {
    pub line: usize,
    pub event_type: String,
    pub code: String,
}

/// One row of a reconstructed word-level eventlist
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectedEvent {
    pub item: usize,
    /// Bin id in the variant's bin scheme
    pub bin_id: u32,
    /// Absolute word onset in seconds
    pub onset: f64,
    /// Milliseconds since the previous retained word; undefined for the first row
    pub delta_ms: Option<f64>,
}

/// Row of an ERP measurement export before joining
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRow {
    pub participant: String,
    pub electrode: String,
    /// Bin id in the variant's bin scheme
    pub bin: u32,
    pub value: f64,
}

/// Amplitude joined with its pre-stimulus baseline
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub participant: String,
    pub electrode: String,
    /// Bin id in the variant's bin scheme
    pub bin: u32,
    pub amplitude: f64,
    pub baseline: f64,
}

impl Measurement {
    /// Both values exactly zero marks a rejected or absent trial
    pub fn is_rejected_sentinel(&self) -> bool {
        self.amplitude == 0.0 && self.baseline == 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElectrodeCoordinate {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Row of a headerless eventlist export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedEvent {
    pub line: usize,
    /// Bin id in the variant's bin scheme
    pub bin: u32,
    pub flags: Option<String>,
}

/// Per-event artifact and ordering info for one participant
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactRecord {
    pub participant: String,
    /// Canonical bin id
    pub bin_id: u32,
    pub clean: bool,
    pub sentence_order: Option<usize>,
}

/// Final analysis row
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRow {
    pub measurement: Measurement,
    pub word: WordRecord,
    pub coordinate: ElectrodeCoordinate,
    pub clean: bool,
    pub sentence_order: Option<usize>,
}

/// A source row that failed fixed-column parsing and was skipped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MalformedRow {
    pub path: String,
    pub line: usize,
    pub reason: String,
}

/// Rows parsed from one source plus the rows that had to be skipped
#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub rows: Vec<T>,
    pub malformed: Vec<MalformedRow>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            malformed: Vec::new(),
        }
    }
}
