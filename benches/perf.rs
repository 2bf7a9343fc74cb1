use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use canwest_soccer::features::ANALYTIC_FEATURES;
use canwest_soccer::model::{
    ARTIFACT_VERSION, Classifier, ClassifierArtifact, ModelKind, TrainingMetrics,
};
use canwest_soccer::normalize::PositionGroup;
use canwest_soccer::pipeline::FeatureTables;
use canwest_soccer::prematch::{latest_form_by_team, predictive_vector};
use canwest_soccer::records::{BoxscoreRow, LineupRow, MatchRecord};
use canwest_soccer::swap::{SwapRequest, SwapSimulator};
use canwest_soccer::training::{predictive_samples, train_classifier};

const TEAMS: usize = 10;
const ROUNDS: usize = 18;
const SQUAD: usize = 16;

fn team(i: usize) -> String {
    format!("team-{i}")
}

fn player(t: usize, p: usize) -> String {
    format!("player {t}-{p}")
}

/// Round-robin season with deterministic stat lines.
fn synthetic_season() -> (Vec<MatchRecord>, Vec<BoxscoreRow>, Vec<LineupRow>) {
    let mut matches = Vec::new();
    let mut boxscores = Vec::new();
    for round in 0..ROUNDS {
        for pair in 0..TEAMS / 2 {
            let h = (pair + round) % TEAMS;
            let a = (TEAMS - 1 - pair + round) % TEAMS;
            let match_id = format!("r{round:02}-{pair}");
            let hg = ((round * 7 + pair * 3) % 4) as u32;
            let ag = ((round * 5 + pair) % 3) as u32;
            matches.push(MatchRecord {
                match_id: match_id.clone(),
                season: "2023".to_string(),
                date: format!("2023-{:02}-{:02}", 8 + round / 28, 1 + round % 28),
                home_team: team(h),
                away_team: team(a),
                home_goals: Some(hg),
                away_goals: Some(ag),
            });
            for t in [h, a] {
                for p in 0..11 {
                    let slot = (p + round) % SQUAD;
                    let seed = (round * 31 + t * 17 + slot * 13) % 11;
                    boxscores.push(BoxscoreRow {
                        match_id: match_id.clone(),
                        team: team(t),
                        player: player(t, slot),
                        number: slot.to_string(),
                        position: String::new(),
                        goals: if seed == 0 { 1.0 } else { 0.0 },
                        shots: (seed % 4) as f64,
                        sog: (seed % 2) as f64,
                        assists: if seed == 5 { 1.0 } else { 0.0 },
                    });
                }
            }
        }
    }
    let mut lineups = Vec::new();
    for t in 0..TEAMS {
        for p in 0..SQUAD {
            lineups.push(LineupRow {
                season: "2023".to_string(),
                team: team(t),
                player: player(t, p),
                number: p.to_string(),
                year: ["Fr.", "So.", "Jr.", "Sr."][p % 4].to_string(),
                position: ["GK", "D", "M", "F"][p % 4].to_string(),
                gp: 0.0,
                gs: 0.0,
                goals: 0.0,
                assists: 0.0,
                points: 0.0,
                year_num: 0,
                year_std: String::new(),
                position_zone: String::new(),
                position_group: PositionGroup::Unk,
            });
        }
    }
    (matches, boxscores, lineups)
}

fn analytic_model() -> Classifier {
    let d = ANALYTIC_FEATURES.len();
    Classifier::from_artifact(ClassifierArtifact {
        version: ARTIFACT_VERSION,
        kind: ModelKind::Analytic,
        generated_at: "bench".to_string(),
        feature_names: ANALYTIC_FEATURES.iter().map(|s| s.to_string()).collect(),
        feature_means: vec![0.0; d],
        feature_stds: vec![1.0; d],
        coeffs: vec![vec![0.05; d], vec![0.0; d], vec![-0.05; d]],
        intercepts: vec![0.0; 3],
        l2: 0.0,
        metrics: TrainingMetrics::default(),
    })
    .expect("valid artifact")
}

fn bench_feature_build(c: &mut Criterion) {
    let (matches, boxscores, lineups) = synthetic_season();
    c.bench_function("feature_build", |b| {
        b.iter(|| {
            let tables = FeatureTables::build(
                black_box(&matches),
                boxscores.clone(),
                lineups.clone(),
            );
            black_box(tables.prematch.len());
        })
    });
}

fn bench_predict(c: &mut Criterion) {
    let (matches, boxscores, lineups) = synthetic_season();
    let tables = FeatureTables::build(&matches, boxscores, lineups);
    let model = train_classifier(
        ModelKind::Predictive,
        predictive_samples(&tables.prematch),
        &Default::default(),
    )
    .expect("trained")
    .classifier;
    let latest = latest_form_by_team(&tables.prematch);
    let home = &latest[&team(0)];
    let away = &latest[&team(1)];

    c.bench_function("predict_match", |b| {
        b.iter(|| {
            let v = predictive_vector(black_box(home), black_box(away), true);
            black_box(model.predict(&v));
        })
    });
}

fn bench_swap(c: &mut Criterion) {
    let (matches, boxscores, lineups) = synthetic_season();
    let tables = FeatureTables::build(&matches, boxscores, lineups);
    let sim = SwapSimulator::new(&tables.enriched, &tables.boxscores, &tables.lineups);
    let model = analytic_model();
    let first = &tables.enriched[0];
    let lineup = sim.lineup(&first.match_id, &first.team);
    let req = SwapRequest {
        match_id: first.match_id.clone(),
        team: first.team.clone(),
        swap_out: lineup[0].player.clone(),
        swap_in: sim.swap_in_candidates(&first.match_id, &first.team)[0].clone(),
    };

    c.bench_function("swap_simulate", |b| {
        b.iter(|| {
            let report = sim.simulate(&model, black_box(&req)).expect("swap");
            black_box(report.after.probs.win);
        })
    });
}

fn bench_train_predictive(c: &mut Criterion) {
    let (matches, boxscores, lineups) = synthetic_season();
    let tables = FeatureTables::build(&matches, boxscores, lineups);
    let samples = predictive_samples(&tables.prematch);
    let settings = canwest_soccer::config::TrainingSettings {
        max_iters: 200,
        ..Default::default()
    };
    c.bench_function("train_predictive_200_iters", |b| {
        b.iter(|| {
            let trained = train_classifier(ModelKind::Predictive, samples.clone(), &settings)
                .expect("trained");
            black_box(trained.metrics().val_log_loss);
        })
    });
}

criterion_group!(
    perf,
    bench_feature_build,
    bench_predict,
    bench_swap,
    bench_train_predictive
);
criterion_main!(perf);
