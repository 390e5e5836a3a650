use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{PrepError, Result};
use crate::identifiers::{participant_label, BinScheme};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const CONFIG_ENV_VAR: &str = "SURPRISAL_PREP_CONFIG";

static TEMPLATE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^{}]*)\}").expect("valid template token regex"));
const TEMPLATE_TOKENS: [&str; 2] = ["participant", "index"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where run manifests are written
    pub manifest_dir: PathBuf,
    pub stimuli: StimuliConfig,
    pub markers: MarkerConfig,
    pub sentinels: SentinelConfig,
    pub joins: JoinConfig,
    pub variants: BTreeMap<String, VariantConfig>,
}

/// Stimulus-side inputs for the design-matrix builder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StimuliConfig {
    pub root: PathBuf,
    pub annotation_roots: Vec<PathBuf>,
    pub annotation_extension: String,
    pub master_features: PathBuf,
    pub design_matrix: PathBuf,
    pub electrode_coordinates: PathBuf,
    pub silence_token: String,
}

/// Trigger conventions of the recording setup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkerConfig {
    pub trigger_base: i64,
    /// Response-button codes; they collide with passages 101 and 102
    pub button_codes: Vec<i64>,
    /// Passages whose trigger numbering is duplicated in the recordings
    pub excluded_passages: Vec<u32>,
    pub sound_event_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SentinelConfig {
    /// Prominence label meaning "unlabeled"
    pub unlabeled_prominence: i64,
    /// POS binary tag meaning "function word"
    pub function_word_pos: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JoinConfig {
    /// Turn ambiguous join matches into a hard error instead of a counted drop
    pub fail_on_ambiguous: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SkipCounts {
    pub hardware_header_lines: usize,
    pub presentation_header_lines: usize,
    pub presentation_footer_lines: usize,
    pub exported_header_lines: usize,
}

/// Optional pipeline steps a dataset variant supports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Capabilities {
    pub artifact_rejection: bool,
    pub sentence_order: bool,
}

impl Capabilities {
    pub fn needs_rejection_eventlist(&self) -> bool {
        self.artifact_rejection || self.sentence_order
    }
}

/// Per-variant settings as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VariantConfig {
    pub data_root: PathBuf,
    pub participant_count: u32,
    pub participant_label: String,
    /// Participants with known recording problems
    pub excluded_participants: Vec<u32>,
    pub bin_scheme: BinScheme,
    pub hardware_eventlist: String,
    pub presentation_logs: Vec<String>,
    pub corrected_eventlist: String,
    pub exported_eventlist: String,
    pub rejection_eventlist: String,
    pub regressor_dir: String,
    pub amplitude_table: String,
    pub baseline_table: String,
    pub observation_table: String,
    pub skip: SkipCounts,
    pub capabilities: Capabilities,
    pub drop_columns: Vec<String>,
}

/// File-name template keyed by participant, e.g. `log/{participant}_a.log`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate(String);

impl PathTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        for caps in TEMPLATE_TOKEN.captures_iter(template) {
            let token = &caps[1];
            if !TEMPLATE_TOKENS.contains(&token) {
                return Err(PrepError::Config(format!(
                    "unknown placeholder '{{{}}}' in template '{}'",
                    token, template
                )));
            }
        }
        Ok(Self(template.to_string()))
    }

    pub fn render(&self, root: &Path, participant: &Participant) -> PathBuf {
        let rendered = self
            .0
            .replace("{participant}", &participant.label)
            .replace("{index}", &participant.index.to_string());
        root.join(rendered)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub index: u32,
    pub label: String,
}

/// A variant resolved once at startup; everything downstream reads from this
#[derive(Debug, Clone)]
pub struct VariantPlan {
    pub name: String,
    pub data_root: PathBuf,
    pub participants: Vec<Participant>,
    pub excluded_participants: Vec<Participant>,
    pub bin_scheme: BinScheme,
    pub hardware_eventlist: PathTemplate,
    pub presentation_logs: Vec<PathTemplate>,
    pub corrected_eventlist: PathTemplate,
    pub exported_eventlist: PathTemplate,
    pub rejection_eventlist: PathTemplate,
    pub regressor_dir: PathTemplate,
    pub amplitude_table: PathBuf,
    pub baseline_table: PathBuf,
    pub observation_table: PathBuf,
    pub skip: SkipCounts,
    pub capabilities: Capabilities,
    pub drop_columns: Vec<String>,
}

impl VariantPlan {
    pub fn path(&self, template: &PathTemplate, participant: &Participant) -> PathBuf {
        template.render(&self.data_root, participant)
    }
}

impl Config {
    /// Pick the config path: explicit flag, then environment, then the default file name
    pub fn locate(explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().filter(|v| !v.trim().is_empty()).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(path).map_err(|e| {
            PrepError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        config.validate()?;
        info!(path = %path.display(), variants = config.variants.len(), "Loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stimuli.annotation_extension.trim().is_empty() {
            return Err(PrepError::Config("stimuli.annotation_extension is empty".to_string()));
        }
        if self.markers.sound_event_type.trim().is_empty() {
            return Err(PrepError::Config("markers.sound_event_type is empty".to_string()));
        }
        debug!(
            excluded_passages = ?self.markers.excluded_passages,
            button_codes = ?self.markers.button_codes,
            "Marker exclusions in effect"
        );
        if self.variants.is_empty() {
            return Err(PrepError::Config("no data variants configured".to_string()));
        }
        Ok(())
    }

    /// Resolve a named variant, optionally restricted to a participant subset.
    /// Fails before any data file is touched.
    pub fn resolve_variant(&self, name: &str, subset: Option<&[u32]>) -> Result<VariantPlan> {
        let variant = self.variants.get(name).ok_or_else(|| PrepError::UnknownVariant {
            name: name.to_string(),
            known: self.variants.keys().cloned().collect::<Vec<_>>().join(", "),
        })?;

        if variant.participant_count == 0 {
            return Err(PrepError::Config(format!("variant '{}' has no participants", name)));
        }
        if !variant.participant_label.contains("{index}") {
            return Err(PrepError::Config(format!(
                "variant '{}': participant_label '{}' must contain {{index}}",
                name, variant.participant_label
            )));
        }
        if variant.presentation_logs.is_empty() {
            return Err(PrepError::Config(format!("variant '{}' lists no presentation logs", name)));
        }

        let indices: Vec<u32> = match subset {
            Some(indices) => {
                if let Some(bad) = indices
                    .iter()
                    .find(|i| **i == 0 || **i > variant.participant_count)
                {
                    return Err(PrepError::Config(format!(
                        "participant {} is outside 1..={} for variant '{}'",
                        bad, variant.participant_count, name
                    )));
                }
                indices.to_vec()
            }
            None => (1..=variant.participant_count).collect(),
        };

        let make = |index: u32| Participant {
            index,
            label: participant_label(&variant.participant_label, index),
        };
        let (excluded, participants): (Vec<Participant>, Vec<Participant>) = indices
            .into_iter()
            .map(make)
            .partition(|p| variant.excluded_participants.contains(&p.index));

        let root = &variant.data_root;
        Ok(VariantPlan {
            name: name.to_string(),
            data_root: root.clone(),
            participants,
            excluded_participants: excluded,
            bin_scheme: variant.bin_scheme,
            hardware_eventlist: PathTemplate::parse(&variant.hardware_eventlist)?,
            presentation_logs: variant
                .presentation_logs
                .iter()
                .map(|t| PathTemplate::parse(t))
                .collect::<Result<Vec<_>>>()?,
            corrected_eventlist: PathTemplate::parse(&variant.corrected_eventlist)?,
            exported_eventlist: PathTemplate::parse(&variant.exported_eventlist)?,
            rejection_eventlist: PathTemplate::parse(&variant.rejection_eventlist)?,
            regressor_dir: PathTemplate::parse(&variant.regressor_dir)?,
            amplitude_table: root.join(&variant.amplitude_table),
            baseline_table: root.join(&variant.baseline_table),
            observation_table: root.join(&variant.observation_table),
            skip: variant.skip.clone(),
            capabilities: variant.capabilities,
            drop_columns: variant.drop_columns.clone(),
        })
    }
}

impl StimuliConfig {
    pub fn path(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    pub fn design_matrix_path(&self) -> PathBuf {
        self.path(&self.design_matrix)
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut variants = BTreeMap::new();
        variants.insert("audio".to_string(), VariantConfig::audio());
        variants.insert("video".to_string(), VariantConfig::video());
        Self {
            manifest_dir: PathBuf::from("runs"),
            stimuli: StimuliConfig::default(),
            markers: MarkerConfig::default(),
            sentinels: SentinelConfig::default(),
            joins: JoinConfig::default(),
            variants,
        }
    }
}

impl Default for StimuliConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("stimuli"),
            annotation_roots: vec![
                PathBuf::from("prosody_category/GestureAudio"),
                PathBuf::from("prosody_category/NoGestureAudio"),
            ],
            annotation_extension: ".prom.disc".to_string(),
            master_features: PathBuf::from("WordMerged_total.csv"),
            design_matrix: PathBuf::from("word_merged_audio.csv"),
            electrode_coordinates: PathBuf::from("channel_coordinate.csv"),
            silence_token: "_SIL_".to_string(),
        }
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            trigger_base: 100,
            button_codes: vec![201, 202],
            excluded_passages: vec![29, 49, 85],
            sound_event_type: "Sound".to_string(),
        }
    }
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            unlabeled_prominence: 3,
            function_word_pos: 0,
        }
    }
}

impl Default for SkipCounts {
    fn default() -> Self {
        Self {
            hardware_header_lines: 20,
            presentation_header_lines: 3,
            presentation_footer_lines: 13,
            exported_header_lines: 4733,
        }
    }
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self::audio()
    }
}

impl VariantConfig {
    pub fn audio() -> Self {
        Self {
            data_root: PathBuf::from("data_audio"),
            participant_count: 25,
            participant_label: "part{index}".to_string(),
            excluded_participants: Vec::new(),
            bin_scheme: BinScheme::New,
            hardware_eventlist: "eventlist/original/eventlist_{participant}.txt".to_string(),
            presentation_logs: vec![
                "log/{participant}_a.log".to_string(),
                "log/{participant}_b.log".to_string(),
            ],
            corrected_eventlist: "eventlist/word/eventlist_word_{participant}.txt".to_string(),
            exported_eventlist: "eventlist/export/eventlist_export_{participant}.txt".to_string(),
            rejection_eventlist: "eventlist/export_ar/eventlist_export_AR_{participant}.txt".to_string(),
            regressor_dir: "LIMO/data/{participant}".to_string(),
            amplitude_table: "lmer/300-500.txt".to_string(),
            baseline_table: "lmer/baseline.txt".to_string(),
            observation_table: "lmer/300-500_info.csv".to_string(),
            skip: SkipCounts::default(),
            capabilities: Capabilities {
                artifact_rejection: true,
                sentence_order: true,
            },
            drop_columns: default_drop_columns(),
        }
    }

    pub fn video() -> Self {
        Self {
            data_root: PathBuf::from("data_video"),
            participant_count: 30,
            bin_scheme: BinScheme::Old,
            skip: SkipCounts {
                exported_header_lines: 2674,
                ..SkipCounts::default()
            },
            capabilities: Capabilities::default(),
            ..Self::audio()
        }
    }
}

fn default_drop_columns() -> Vec<String> {
    [
        "meaningful_gesture_prev",
        "beat_gesture_prev",
        "gesture_corres_prev",
        "mouth_dist_prev",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_variant_fails_fast() {
        let config = Config::default();
        let err = config.resolve_variant("eyetracking", None).unwrap_err();
        match err {
            PrepError::UnknownVariant { name, known } => {
                assert_eq!(name, "eyetracking");
                assert!(known.contains("audio"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn resolves_participants_and_exclusions() {
        let mut config = Config::default();
        config
            .variants
            .get_mut("audio")
            .unwrap()
            .excluded_participants = vec![2];
        let plan = config.resolve_variant("audio", Some(&[1, 2, 3][..])).unwrap();
        let labels: Vec<&str> = plan.participants.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["part1", "part3"]);
        assert_eq!(plan.excluded_participants[0].label, "part2");
    }

    #[test]
    fn subset_outside_range_is_rejected() {
        let config = Config::default();
        assert!(config.resolve_variant("audio", Some(&[26][..])).is_err());
        assert!(config.resolve_variant("audio", Some(&[0][..])).is_err());
    }

    #[test]
    fn template_renders_participant_tokens() {
        let template = PathTemplate::parse("log/{participant}_{index}.log").unwrap();
        let participant = Participant {
            index: 4,
            label: "part4".to_string(),
        };
        assert_eq!(
            template.render(Path::new("root"), &participant),
            PathBuf::from("root/log/part4_4.log")
        );
        assert!(PathTemplate::parse("log/{subject}.log").is_err());
    }

    #[test]
    fn toml_overrides_keep_defaults_for_missing_fields() {
        let config: Config = toml::from_str(
            r#"
            [markers]
            excluded_passages = [7]

            [variants.audio]
            data_root = "/data/audio"
            participant_count = 2

            [variants.audio.capabilities]
            artifact_rejection = true
            "#,
        )
        .unwrap();
        assert_eq!(config.markers.excluded_passages, vec![7]);
        assert_eq!(config.markers.trigger_base, 100);
        let audio = &config.variants["audio"];
        assert_eq!(audio.participant_count, 2);
        assert!(audio.capabilities.artifact_rejection);
        assert!(!audio.capabilities.sentence_order);
        assert_eq!(audio.skip.hardware_header_lines, 20);
        assert!(!config.variants.contains_key("video"));
    }

    #[test]
    fn video_variant_lacks_rejection_info() {
        let video = VariantConfig::video();
        assert!(!video.capabilities.needs_rejection_eventlist());
        assert_eq!(video.bin_scheme, BinScheme::Old);
        assert_eq!(video.skip.exported_header_lines, 2674);
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("[markers]\ntriger_base = 3\n");
        assert!(result.is_err());
    }
}
