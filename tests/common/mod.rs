// Synthetic study tree for running whole stages through the file adapters

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use surprisal_prep::config::{Config, SkipCounts, StimuliConfig, VariantConfig};

const MASTER: &str = "\
WordID,SentenceID,Unnamed: 3,word,bin_id,POSBinary,SurprisalFull,surprisal_gpt,surprisal_bert
1,12,S,the,10,0,1.5,2.5,3.5
2,12,S,dog,11,1,4.0,5.0,6.0
3,13,G,ran,12,1,7.0,8.0,9.0
";

const HARDWARE: &str = "\
# ERPLAB eventlist
item\tbepoch\t  ecode\tlabel\t      onset\tdiff\tdura\tb_flags\ta_flags\tenable\tbin
1\t0\t112\t\"\"\t10.000\t0\t0.0\t00000000 00000000\t1\t[ ]\t
2\t0\t201\t\"\"\t15.000\t0\t0.0\t00000000 00000000\t1\t[ ]\t
3\t0\t113\t\"\"\t20.000\t0\t0.0\t00000000 00000000\t1\t[ ]\t
";

const LOG_A: &str = "Scenario - session a\nSubject\tTrial\tEvent Type\tCode\tTime\npart1\t1\tSound\t12S\t100\nend of log\n";
const LOG_B: &str = "Scenario - session b\nSubject\tTrial\tEvent Type\tCode\tTime\npart1\t1\tSound\t13G\t100\nend of log\n";

const EXPORTED: &str = "\
bin descriptor header
1\t0\t0\t\"\"\t10.0\t0\t0.0\t    00000000     00000000\t1
2\t0\t1\t\"\"\t10.25\t0\t0.0\t    00000000     00000000\t1
3\t0\t2\t\"\"\t20.5\t0\t0.0\t    00000000     00000001\t1
";

const AMPLITUDE: &str = "\
worklat\t       value\t     chlabel\t        bini\tERPset
300-500\t1.5\t    Cz\t0\tpart1
300-500\t0.0\t    Cz\t1\tpart1
300-500\t-2.0\t    Cz\t2\tpart1
300-500\t0.0\t    Pz\t2\tpart1
";

const BASELINE: &str = "\
worklat\t       value\t     chlabel\t        bini\tERPset
-100-0\t0.5\t    Cz\t0\tpart1
-100-0\t1.2\t    Cz\t1\tpart1
-100-0\t0.3\t    Cz\t2\tpart1
-100-0\t0.0\t    Pz\t2\tpart1
";

const ELECTRODES: &str = "Channel,X,Y,Z\n Cz ,0.0,0.0,1.0\n Pz ,0.0,-0.7,0.7\n";

pub struct StudyTree {
    pub dir: TempDir,
    pub config: Config,
}

impl StudyTree {
    /// One recorded participant (part1) with two passages, 12S and 13G
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let variant = VariantConfig {
            data_root: root.join("data"),
            participant_count: 1,
            skip: SkipCounts {
                hardware_header_lines: 1,
                presentation_header_lines: 1,
                presentation_footer_lines: 1,
                exported_header_lines: 1,
            },
            ..VariantConfig::audio()
        };

        let mut config = Config {
            manifest_dir: root.join("runs"),
            stimuli: StimuliConfig {
                root: root.join("stimuli"),
                annotation_roots: vec![PathBuf::from("prosody/GestureAudio"), PathBuf::from("prosody/NoGestureAudio")],
                master_features: PathBuf::from("master.csv"),
                ..StimuliConfig::default()
            },
            ..Config::default()
        };
        config.variants.clear();
        config.variants.insert("audio".to_string(), variant);

        let tree = Self { dir, config };
        tree.write("stimuli/master.csv", MASTER);
        tree.write("stimuli/channel_coordinate.csv", ELECTRODES);
        tree.write(
            "stimuli/prosody/GestureAudio/12S.prom.disc",
            "12S\t0.000\t0.200\tthe\t0.4\t0.0\t1\n12S\t0.200\t0.250\t_SIL_\t\t\t\n12S\t0.250\t0.500\tdog\t0.1\t0.0\t3\n",
        );
        tree.write(
            "stimuli/prosody/NoGestureAudio/13G.prom.disc",
            "13G\t0.5\t0.8\tran\t0.9\t1.0\t2\n",
        );
        tree.write("data/eventlist/original/eventlist_part1.txt", HARDWARE);
        tree.write("data/log/part1_a.log", LOG_A);
        tree.write("data/log/part1_b.log", LOG_B);
        tree.write("data/eventlist/export/eventlist_export_part1.txt", EXPORTED);
        tree.write("data/eventlist/export_ar/eventlist_export_AR_part1.txt", EXPORTED);
        tree.write("data/lmer/300-500.txt", AMPLITUDE);
        tree.write("data/lmer/baseline.txt", BASELINE);
        tree
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }
}

