#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use canwest_soccer::clean::{
    lineups_from_table, load_raw_boxscores, merge_season_lineups, season_lineup_files,
};
use canwest_soccer::config::{DataPaths, Settings, TrainingSettings};
use canwest_soccer::dashboard::Workspace;
use canwest_soccer::features::ANALYTIC_FEATURES;
use canwest_soccer::model::{
    ARTIFACT_VERSION, Classifier, ClassifierArtifact, ModelKind, TrainingMetrics,
};
use canwest_soccer::pipeline::{FeatureTables, load_matches};
use canwest_soccer::records::MatchRecord;
use canwest_soccer::training::{analytic_samples, predictive_samples, train_classifier};

pub fn fixture_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path
}

/// A scratch directory unique to one test.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("canwest_it_{name}_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

/// Copies the fixture season into `dir/data` and returns settings rooted
/// there.
pub fn fixture_settings(dir: &Path) -> Settings {
    let data = dir.join("data");
    copy_dir(&fixture_dir(), &data);
    Settings {
        data_dir: data,
        models_dir: dir.join("models"),
        log_file: None,
        boxscore_realign: true,
        training: quick_training(),
    }
}

pub fn quick_training() -> TrainingSettings {
    TrainingSettings {
        val_fraction: 0.2,
        l2: 0.01,
        max_iters: 400,
    }
}

fn copy_dir(from: &Path, to: &Path) {
    fs::create_dir_all(to).expect("create dir");
    for entry in fs::read_dir(from).expect("read fixture dir") {
        let entry = entry.expect("dir entry");
        let target = to.join(entry.file_name());
        if entry.path().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), &target).expect("copy fixture");
        }
    }
}

/// The fixture season built in memory, without touching the fixture dir.
pub fn fixture_tables() -> (Vec<MatchRecord>, FeatureTables) {
    let paths = DataPaths::new(&fixture_dir(), Path::new("unused"));
    let matches = load_matches(&paths).expect("fixture matches");
    let boxscores = load_raw_boxscores(&paths.boxscores_raw, true).expect("fixture boxscores");
    let files = season_lineup_files(&paths.lineups_per_season).expect("list rosters");
    let rosters = merge_season_lineups(&files).expect("merge rosters");
    let tables = FeatureTables::build(&matches, boxscores, lineups_from_table(&rosters));
    (matches, tables)
}

pub fn trained_workspace(scenario_dir: PathBuf) -> Workspace {
    let (_, tables) = fixture_tables();
    let settings = quick_training();
    let predictive = train_classifier(
        ModelKind::Predictive,
        predictive_samples(&tables.prematch),
        &settings,
    )
    .expect("train predictive")
    .classifier;
    let analytic = train_classifier(
        ModelKind::Analytic,
        analytic_samples(&tables.opponent),
        &settings,
    )
    .expect("train analytic")
    .classifier;
    Workspace::from_parts(
        tables.enriched.clone(),
        &tables.prematch,
        &tables.boxscores,
        &tables.lineups,
        Some(predictive),
        Some(analytic),
        scenario_dir,
    )
}

/// Analytic model whose win logit rises with the team's per-player goal
/// mean and nothing else.
pub fn goal_mean_model() -> Classifier {
    let d = ANALYTIC_FEATURES.len();
    let g = ANALYTIC_FEATURES
        .iter()
        .position(|n| *n == "G_mean")
        .expect("G_mean in schema");
    let mut win = vec![0.0; d];
    win[g] = 2.0;
    let mut loss = vec![0.0; d];
    loss[g] = -2.0;
    Classifier::from_artifact(ClassifierArtifact {
        version: ARTIFACT_VERSION,
        kind: ModelKind::Analytic,
        generated_at: "test".to_string(),
        feature_names: ANALYTIC_FEATURES.iter().map(|s| s.to_string()).collect(),
        feature_means: vec![0.0; d],
        feature_stds: vec![1.0; d],
        coeffs: vec![win, vec![0.0; d], loss],
        intercepts: vec![0.0, 0.0, 0.0],
        l2: 0.0,
        metrics: TrainingMetrics::default(),
    })
    .expect("valid artifact")
}
