//! Boosted-decision-tree training plans.
//!
//! Training runs in an external multivariate-analysis toolkit. This module
//! loads and validates the training configuration and renders it into the
//! selections and option strings that toolkit consumes, plus a reproducible
//! train/test partition of row indices.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use sq_core::{Error, Result};

/// How rows are assigned to the training and test samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitMode {
    /// Random assignment.
    #[default]
    Random,
    /// Leading rows train, trailing rows test.
    Block,
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitMode::Random => f.write_str("Random"),
            SplitMode::Block => f.write_str("Block"),
        }
    }
}

/// Boosting algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoostType {
    /// Adaptive boosting.
    #[default]
    AdaBoost,
    /// Gradient boosting.
    Grad,
}

/// Node splitting criterion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeparationType {
    /// Gini index.
    #[default]
    GiniIndex,
    /// Cross entropy.
    CrossEntropy,
    /// Misclassification error.
    MisClassificationError,
}

/// Tree pruning method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PruneMethod {
    /// Cost-complexity pruning.
    #[default]
    CostComplexity,
    /// Expected-error pruning.
    ExpectedError,
    /// No pruning.
    NoPruning,
}

macro_rules! debug_display {
    ($($t:ty),*) => {$(
        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    )*};
}

debug_display!(BoostType, SeparationType, PruneMethod);

/// BDT hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BdtOptions {
    /// Number of trees.
    pub n_trees: usize,
    /// Boosting algorithm.
    pub boost_type: BoostType,
    /// Node splitting criterion.
    pub separation_type: SeparationType,
    /// Grid points scanned per variable when splitting a node.
    pub n_cuts: usize,
    /// Pruning method.
    pub prune_method: PruneMethod,
    /// Pruning strength.
    pub prune_strength: f64,
    /// Train each tree on a bagged resample.
    pub use_bagged_boost: bool,
}

impl Default for BdtOptions {
    fn default() -> Self {
        Self {
            n_trees: 400,
            boost_type: BoostType::AdaBoost,
            separation_type: SeparationType::GiniIndex,
            n_cuts: 20,
            prune_method: PruneMethod::CostComplexity,
            prune_strength: 12.0,
            use_bagged_boost: true,
        }
    }
}

impl BdtOptions {
    /// Method option string.
    pub fn option_string(&self) -> String {
        let bagged = if self.use_bagged_boost { "True" } else { "False" };
        format!(
            "H:!V:VarTransform=None:NTrees={}:BoostType={}:SeparationType={}:nCuts={}:\
             PruneMethod={}:PruneStrength={}:UseBaggedBoost={bagged}",
            self.n_trees,
            self.boost_type,
            self.separation_type,
            self.n_cuts,
            self.prune_method,
            self.prune_strength,
        )
    }
}

/// Variables the classifier is trained on by default.
pub const DEFAULT_VARIABLES: [&str; 19] = [
    "_S_vz_interaction_vertex",
    "_S_lxy_interaction_vertex_beampipeCenter",
    "_S_daughters_deltaphi",
    "_S_daughters_deltaeta",
    "_S_daughters_openingsangle",
    "_S_daughters_DeltaR",
    "_S_Ks_openingsangle",
    "_S_Lambda_openingsangle",
    "_S_eta",
    "_Ks_eta",
    "_S_dxy_over_lxy",
    "_Ks_dxy_over_lxy",
    "_Lambda_dxy_over_lxy",
    "_S_dz_min",
    "_Ks_dz_min",
    "_Lambda_dz_min",
    "_Ks_pt",
    "_Lambda_lxy_decay_vertex",
    "_S_chi2_ndof",
];

/// Training configuration (YAML).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Signal sample file.
    pub signal_file: PathBuf,
    /// Background sample file.
    pub background_file: PathBuf,
    /// Tree path inside both files.
    #[serde(default = "default_tree")]
    pub tree: String,
    /// Selection defining the signal class.
    pub signal_selection: String,
    /// Selection defining the background class.
    pub background_selection: String,
    /// Cut applied to both classes before training.
    #[serde(default)]
    pub pre_selection: Option<String>,
    /// Input variables.
    #[serde(default = "default_variables")]
    pub variables: Vec<String>,
    /// Per-event signal weight expression; `null` disables weighting.
    #[serde(default = "default_signal_weight")]
    pub signal_weight: Option<String>,
    /// Fraction of each class used for training.
    #[serde(default = "default_train_test_split")]
    pub train_test_split: f64,
    /// Train/test assignment.
    #[serde(default)]
    pub split_mode: SplitMode,
    /// Hyperparameters.
    #[serde(default)]
    pub method: BdtOptions,
    /// Tag appended to output names.
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_tree() -> String {
    "FlatTreeProducerBDT/FlatTree".to_string()
}

fn default_variables() -> Vec<String> {
    DEFAULT_VARIABLES.iter().map(|v| v.to_string()).collect()
}

fn default_signal_weight() -> Option<String> {
    Some("_S_event_weighting_factorALL".to_string())
}

fn default_train_test_split() -> f64 {
    0.8
}

fn default_version() -> String {
    "v0".to_string()
}

/// Everything the external trainer needs, as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPlan {
    /// Data-loader directory.
    pub dataset_dir: String,
    /// Tree path.
    pub tree: String,
    /// Signal sample file.
    pub signal_file: PathBuf,
    /// Background sample file.
    pub background_file: PathBuf,
    /// Cut selecting signal rows.
    pub signal_cut: String,
    /// Cut selecting background rows.
    pub background_cut: String,
    /// Cut passed to the train/test preparation step.
    pub preparation_cut: String,
    /// Input variables.
    pub variables: Vec<String>,
    /// Signal weight expression.
    pub signal_weight: Option<String>,
    /// Train/test split options.
    pub split_options: String,
    /// Factory job name.
    pub factory_name: String,
    /// Factory options.
    pub factory_options: String,
    /// Booked method name.
    pub method_name: String,
    /// Method options.
    pub method_options: String,
    /// Training output file.
    pub output_file: String,
    /// ROC curve file.
    pub roc_file: String,
}

/// Row indices assigned to training and testing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainTestSplit {
    /// Training rows, ascending.
    pub train: Vec<usize>,
    /// Test rows, ascending.
    pub test: Vec<usize>,
}

impl TrainingConfig {
    /// Read and validate a YAML configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_yaml_slice(&bytes)
    }

    /// Parse and validate YAML bytes.
    pub fn from_yaml_slice(bytes: &[u8]) -> Result<Self> {
        let cfg: TrainingConfig = serde_yaml_ng::from_slice(bytes)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Semantic checks.
    pub fn validate(&self) -> Result<()> {
        let f = self.train_test_split;
        if !(f > 0.0 && f < 1.0) {
            return Err(Error::Validation(format!("train_test_split must be in (0, 1), got {f}")));
        }
        if self.variables.is_empty() {
            return Err(Error::Validation("no training variables".into()));
        }
        let mut seen = HashSet::new();
        for v in &self.variables {
            if v.trim().is_empty() {
                return Err(Error::Validation("empty training variable name".into()));
            }
            if !seen.insert(v.as_str()) {
                return Err(Error::Validation(format!("duplicate training variable '{v}'")));
            }
        }
        let selections = [
            ("signal_selection", &self.signal_selection),
            ("background_selection", &self.background_selection),
        ];
        for (what, sel) in selections {
            if sel.trim().is_empty() {
                return Err(Error::Validation(format!("{what} is empty")));
            }
        }
        if self.method.n_trees == 0 || self.method.n_cuts == 0 {
            return Err(Error::Validation("n_trees and n_cuts must be > 0".into()));
        }
        Ok(())
    }

    fn pre_selection(&self) -> Option<&str> {
        self.pre_selection.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn class_cut(&self, class: &str) -> String {
        match self.pre_selection() {
            Some(pre) => format!("{class} && {pre}"),
            None => class.to_string(),
        }
    }

    /// Render the trainer inputs.
    pub fn plan(&self) -> TrainingPlan {
        let f = self.train_test_split;
        TrainingPlan {
            dataset_dir: format!("dataset_BDT_2016{}", self.version),
            tree: self.tree.clone(),
            signal_file: self.signal_file.clone(),
            background_file: self.background_file.clone(),
            signal_cut: self.class_cut(&self.signal_selection),
            background_cut: self.class_cut(&self.background_selection),
            preparation_cut: self.pre_selection().unwrap_or_default().to_string(),
            variables: self.variables.clone(),
            signal_weight: self.signal_weight.clone(),
            split_options: format!(
                "TrainTestSplit_Signal={f}:TrainTestSplit_Background={f}:SplitMode={}",
                self.split_mode
            ),
            factory_name: "TMVAClassification".to_string(),
            factory_options: "!V:!Silent:Color:Transformations=I:AnalysisType=Classification"
                .to_string(),
            method_name: "BDT".to_string(),
            method_options: self.method.option_string(),
            output_file: format!("BDTOutput_2016_{}.root", self.version),
            roc_file: format!("BDT_2016_{}.root", self.version),
        }
    }

    /// Partition rows `0..n` into `round(n * train_test_split)` training rows
    /// and the rest. `Random` mode is reproducible for a given `seed`.
    pub fn split_rows(&self, n: usize, seed: u64) -> TrainTestSplit {
        let n_train = ((n as f64) * self.train_test_split).round() as usize;
        let mut rows: Vec<usize> = (0..n).collect();
        if self.split_mode == SplitMode::Random {
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            rows.shuffle(&mut rng);
        }
        let mut test = rows.split_off(n_train.min(n));
        let mut train = rows;
        train.sort_unstable();
        test.sort_unstable();
        tracing::debug!(n, n_train = train.len(), n_test = test.len(), seed, "train/test split");
        TrainTestSplit { train, test }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
signal_file: signal.root
background_file: background.root
signal_selection: "_S_charge == -1"
background_selection: "_S_charge == 1"
pre_selection: "_S_lxy_interaction_vertex > 1.9"
version: "_test"
"#;

    fn config() -> TrainingConfig {
        TrainingConfig::from_yaml_slice(MINIMAL.as_bytes()).unwrap()
    }

    #[test]
    fn defaults_reproduce_standard_training() {
        let cfg = config();
        assert_eq!(cfg.variables.len(), 19);
        assert_eq!(cfg.tree, "FlatTreeProducerBDT/FlatTree");
        assert_eq!(cfg.signal_weight.as_deref(), Some("_S_event_weighting_factorALL"));
        assert_eq!(cfg.train_test_split, 0.8);
    }

    #[test]
    fn plan_option_strings() {
        let plan = config().plan();
        assert_eq!(plan.signal_cut, "_S_charge == -1 && _S_lxy_interaction_vertex > 1.9");
        assert_eq!(plan.background_cut, "_S_charge == 1 && _S_lxy_interaction_vertex > 1.9");
        assert_eq!(plan.preparation_cut, "_S_lxy_interaction_vertex > 1.9");
        assert_eq!(
            plan.split_options,
            "TrainTestSplit_Signal=0.8:TrainTestSplit_Background=0.8:SplitMode=Random"
        );
        assert_eq!(
            plan.method_options,
            "H:!V:VarTransform=None:NTrees=400:BoostType=AdaBoost:SeparationType=GiniIndex:\
             nCuts=20:PruneMethod=CostComplexity:PruneStrength=12:UseBaggedBoost=True"
        );
        assert_eq!(
            plan.factory_options,
            "!V:!Silent:Color:Transformations=I:AnalysisType=Classification"
        );
        assert_eq!(plan.factory_name, "TMVAClassification");
        assert_eq!(plan.dataset_dir, "dataset_BDT_2016_test");
        assert_eq!(plan.output_file, "BDTOutput_2016__test.root");
        assert_eq!(plan.roc_file, "BDT_2016__test.root");
    }

    #[test]
    fn class_cut_without_pre_selection() {
        let cfg = TrainingConfig { pre_selection: Some("  ".into()), ..config() };
        let plan = cfg.plan();
        assert_eq!(plan.signal_cut, "_S_charge == -1");
        assert_eq!(plan.preparation_cut, "");
    }

    #[test]
    fn validation_rejects_bad_configs() {
        let bad_split = TrainingConfig { train_test_split: 1.0, ..config() };
        assert!(bad_split.validate().is_err());

        let mut dup = config();
        dup.variables.push("_Ks_pt".into());
        let err = dup.validate().unwrap_err();
        assert!(err.to_string().contains("_Ks_pt"));

        let empty_sel = TrainingConfig { background_selection: " ".into(), ..config() };
        assert!(empty_sel.validate().is_err());

        let mut no_trees = config();
        no_trees.method.n_trees = 0;
        assert!(no_trees.validate().is_err());
    }

    #[test]
    fn random_split_is_reproducible_and_complete() {
        let cfg = config();
        let a = cfg.split_rows(101, 7);
        let b = cfg.split_rows(101, 7);
        assert_eq!(a, b);
        assert_eq!(a.train.len(), 81);
        assert_eq!(a.test.len(), 20);

        let mut all: Vec<usize> = a.train.iter().chain(&a.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..101).collect::<Vec<_>>());
        assert!(a.train.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn block_split_keeps_leading_rows() {
        let cfg = TrainingConfig { split_mode: SplitMode::Block, ..config() };
        let s = cfg.split_rows(10, 0);
        assert_eq!(s.train, (0..8).collect::<Vec<_>>());
        assert_eq!(s.test, vec![8, 9]);
        assert_eq!(cfg.plan().split_options.rsplit(':').next(), Some("SplitMode=Block"));
    }

    #[test]
    fn custom_method_options() {
        let yaml = format!(
            "{MINIMAL}method:\n  n_trees: 50\n  boost_type: Grad\n  use_bagged_boost: false\n"
        );
        let cfg = TrainingConfig::from_yaml_slice(yaml.as_bytes()).unwrap();
        let opts = cfg.plan().method_options;
        assert!(opts.contains("NTrees=50:BoostType=Grad"));
        assert!(opts.ends_with("UseBaggedBoost=False"));
        assert!(opts.contains("nCuts=20"));
    }
}
