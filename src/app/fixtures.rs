// Synthetic study tree shared by the use-case tests

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::{Config, SkipCounts, StimuliConfig, VariantConfig, VariantPlan};

pub const DESIGN_MATRIX: &str = "\
bin_id,bin_id_old,sentence_id,word,onset,offset,prominence_label,pos_binary,surprisal_ngram,surprisal_gpt,surprisal_bert,beat_gesture_prev,gaze
0,10,12S,the,0.0,0.2,1,0,1.5,2.5,3.5,0,left
1,11,12S,dog,0.25,0.5,3,1,4.0,5.0,6.0,1,right
2,12,13G,ran,0.5,0.8,2,1,7.0,8.0,9.0,0,left
";

const HARDWARE: &str = "\
# ERPLAB eventlist
# generated by acquisition
item\tbepoch\t  ecode\tlabel\t      onset\tdiff\tdura\tb_flags\ta_flags\tenable\tbin
1\t0\t112\t\"\"\t10.000\t0\t0.0\t00000000 00000000\t1\t[ ]\t
2\t0\t201\t\"\"\t15.000\t0\t0.0\t00000000 00000000\t1\t[ ]\t
3\t0\t113\t\"\"\t20.000\t0\t0.0\t00000000 00000000\t1\t[ ]\t
";

const LOG_A: &str = "Scenario - session a\nSubject\tTrial\tEvent Type\tCode\tTime\npart1\t1\tPicture\tfix\t50\npart1\t2\tSound\t12S\t100\nend of log\n";
const LOG_B: &str = "Scenario - session b\nSubject\tTrial\tEvent Type\tCode\tTime\npart1\t1\tSound\t13G\t100\nend of log\n";

const EXPORTED: &str = "\
bin descriptor header
1\t0\t0\t\"\"\t10.0\t0\t0.0\t    00000000     00000000\t1
2\t0\t1\t\"\"\t10.25\t0\t0.0\t    00000001     00000000\t1
3\t0\t2\t\"\"\t20.5\t0\t0.0\t    00000000     00000000\t1
";

const AMPLITUDE: &str = "\
worklat\t       value\t     chlabel\t        bini\tERPset
300-500\t1.5\t    Cz\t0\tpart1
300-500\t0.0\t    Cz\t1\tpart1
300-500\t0.0\t    Cz\t2\tpart1
";

const BASELINE: &str = "\
worklat\t       value\t     chlabel\t        bini\tERPset
-100-0\t0.5\t    Cz\t0\tpart1
-100-0\t1.2\t    Cz\t1\tpart1
-100-0\t0.0\t    Cz\t2\tpart1
";

const ELECTRODES: &str = "Channel,X,Y,Z\n Cz ,0.0,0.0,1.0\n";

const MASTER: &str = "\
WordID,SentenceID,Unnamed: 3,word,bin_id,POSBinary,SurprisalFull,surprisal_gpt,surprisal_bert
1,12,S,the,10,0,1.5,2.5,3.5
2,12,S,dog,11,1,4.0,5.0,6.0
3,13,G,ran,12,1,7.0,8.0,9.0
";

pub struct Fixture {
    pub dir: TempDir,
    pub config: Config,
}

impl Fixture {
    /// Two configured participants; only part1 has recordings
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let mut variant = VariantConfig {
            data_root: root.join("data"),
            participant_count: 2,
            skip: SkipCounts {
                hardware_header_lines: 2,
                presentation_header_lines: 1,
                presentation_footer_lines: 1,
                exported_header_lines: 1,
            },
            ..VariantConfig::audio()
        };
        variant.drop_columns = vec!["beat_gesture_prev".to_string()];

        let mut config = Config {
            manifest_dir: root.join("runs"),
            stimuli: StimuliConfig {
                root: root.join("stimuli"),
                annotation_roots: vec![PathBuf::from("prosody")],
                master_features: PathBuf::from("master.csv"),
                ..StimuliConfig::default()
            },
            ..Config::default()
        };
        config.variants.clear();
        config.variants.insert("audio".to_string(), variant);

        let fixture = Self { dir, config };
        fixture.write("stimuli/word_merged_audio.csv", DESIGN_MATRIX);
        fixture.write("stimuli/channel_coordinate.csv", ELECTRODES);
        fixture.write("stimuli/master.csv", MASTER);
        fixture.write(
            "stimuli/prosody/12S.prom.disc",
            "12S\t0.0\t0.2\tthe\t0.4\t0.0\t1\n12S\t0.2\t0.25\t_SIL_\t\t\t\n12S\t0.25\t0.5\tdog\t0.1\t0.0\t3\n",
        );
        fixture.write("stimuli/prosody/13G.prom.disc", "13G\t0.5\t0.8\tran\t0.9\t1.0\t2\n");
        fixture.write("data/eventlist/original/eventlist_part1.txt", HARDWARE);
        fixture.write("data/log/part1_a.log", LOG_A);
        fixture.write("data/log/part1_b.log", LOG_B);
        fixture.write("data/eventlist/export/eventlist_export_part1.txt", EXPORTED);
        fixture.write("data/eventlist/export_ar/eventlist_export_AR_part1.txt", EXPORTED);
        fixture.write("data/lmer/300-500.txt", AMPLITUDE);
        fixture.write("data/lmer/baseline.txt", BASELINE);
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.root().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn plan(&self) -> VariantPlan {
        self.config.resolve_variant("audio", None).unwrap()
    }
}
