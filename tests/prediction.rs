mod common;

use canwest_soccer::features::{FeatureVector, PREDICTIVE_FEATURES};
use canwest_soccer::model::{
    ARTIFACT_VERSION, Classifier, ClassifierArtifact, ModelKind, TrainingMetrics,
};
use canwest_soccer::records::Outcome;
use canwest_soccer::training::{predictive_samples, train_classifier};

fn form_model() -> Classifier {
    let d = PREDICTIVE_FEATURES.len();
    let mut win = vec![0.0; d];
    let mut loss = vec![0.0; d];
    for (i, name) in PREDICTIVE_FEATURES.iter().enumerate() {
        let w = match *name {
            "shots_form_diff" => 0.6,
            "is_home" => 0.2,
            "win_rate_diff" => 0.9,
            _ => 0.0,
        };
        win[i] = w;
        loss[i] = -w;
    }
    Classifier::from_artifact(ClassifierArtifact {
        version: ARTIFACT_VERSION,
        kind: ModelKind::Predictive,
        generated_at: "test".to_string(),
        feature_names: PREDICTIVE_FEATURES.iter().map(|s| s.to_string()).collect(),
        feature_means: vec![0.0; d],
        feature_stds: vec![1.0; d],
        coeffs: vec![win, vec![0.0; d], loss],
        intercepts: vec![0.0, 0.3, 0.0],
        l2: 0.01,
        metrics: TrainingMetrics::default(),
    })
    .expect("valid artifact")
}

fn home_vs_away(home_shots: f64, away_shots: f64) -> FeatureVector {
    FeatureVector::from_pairs([
        ("shots_rolling3", home_shots),
        ("shots_form_diff", home_shots - away_shots),
        ("is_home", 1.0),
    ])
}

#[test]
fn probabilities_form_a_distribution() {
    let model = form_model();
    let p = model.predict(&home_vs_away(5.0, 3.0));
    assert!((p.probs.sum() - 1.0).abs() < 1e-9);
    assert!(p.probs.as_array().iter().all(|v| (0.0..=1.0).contains(v)));
    assert_eq!(p.label, Outcome::Win);
}

#[test]
fn same_vector_same_answer() {
    let model = form_model();
    let v = home_vs_away(5.0, 3.0);
    let first = model.predict(&v);
    for _ in 0..10 {
        assert_eq!(model.predict(&v), first);
    }
}

#[test]
fn unknown_columns_do_not_matter() {
    let model = form_model();
    let mut v = home_vs_away(5.0, 3.0);
    let base = model.predict(&v);
    v.set("not_a_feature", 42.0);
    assert_eq!(model.predict(&v), base);
}

#[test]
fn fixture_models_predict_every_pairing() {
    let dir = common::scratch_dir("prediction_pairs");
    let ws = common::trained_workspace(dir.join("swap_scenarios"));
    let teams = ws.teams();
    assert_eq!(teams, vec!["twu", "ubc", "unbc"]);
    for home in &teams {
        for away in &teams {
            let res = ws.predict_match(home, away);
            if home == away {
                assert!(res.is_err());
                continue;
            }
            let p = res.expect("prediction").prediction;
            assert!((p.probs.sum() - 1.0).abs() < 1e-9, "{home} v {away}");
        }
    }
}

#[test]
fn trained_artifact_survives_a_round_trip() {
    let (_, tables) = common::fixture_tables();
    let trained = train_classifier(
        ModelKind::Predictive,
        predictive_samples(&tables.prematch),
        &common::quick_training(),
    )
    .expect("trained");
    let m = trained.metrics();
    assert_eq!(m.train_samples + m.val_samples, 12);
    // 6 played matches, latest 20% rounded up = 2 matches = 4 rows
    assert_eq!(m.val_samples, 4);

    let dir = common::scratch_dir("prediction_round_trip");
    let path = dir.join("predictive_model.json");
    trained.classifier.save(&path).expect("saved");
    let loaded = Classifier::load(&path).expect("loaded");
    for row in &tables.prematch {
        let v = row.feature_vector();
        let a = loaded.predict(&v);
        let b = trained.classifier.predict(&v);
        assert_eq!(a.label, b.label);
        for (x, y) in a.probs.as_array().iter().zip(b.probs.as_array()) {
            assert!((x - y).abs() < 1e-12);
        }
    }
}
