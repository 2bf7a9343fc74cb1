use std::collections::{BTreeSet, HashSet};

use anyhow::{Result, anyhow};

use crate::config::{DataPaths, TrainingSettings};
use crate::model::{
    ARTIFACT_VERSION, Classifier, ClassifierArtifact, ModelKind, TrainingMetrics, dot, softmax,
    standardized,
};
use crate::opponent::OpponentRow;
use crate::prematch::FormRow;
use crate::records::{Outcome, date_sort_key};
use crate::table::read_records;

const LR_START: f64 = 0.3;
const LR_DECAY: f64 = 0.003;
const EVAL_EVERY: usize = 20;
const PATIENCE: usize = 20;
const IMPROVEMENT_EPS: f64 = 1e-5;

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub match_id: String,
    pub date: String,
    pub x: Vec<f64>,
    pub y: Outcome,
}

pub fn predictive_samples(rows: &[FormRow]) -> Vec<Sample> {
    rows.iter()
        .filter_map(|r| {
            Some(Sample {
                match_id: r.match_id.clone(),
                date: r.date.clone(),
                x: r.feature_vector().aligned(ModelKind::Predictive.schema()),
                y: r.result?,
            })
        })
        .collect()
}

pub fn analytic_samples(rows: &[OpponentRow]) -> Vec<Sample> {
    rows.iter()
        .filter_map(|r| {
            Some(Sample {
                match_id: r.match_id.clone(),
                date: r.date.clone(),
                x: r.feature_vector().aligned(ModelKind::Analytic.schema()),
                y: r.result?,
            })
        })
        .collect()
}

pub fn load_samples(kind: ModelKind, paths: &DataPaths) -> Result<Vec<Sample>> {
    Ok(match kind {
        ModelKind::Predictive => predictive_samples(&read_records::<FormRow>(&paths.features_prematch)?),
        ModelKind::Analytic => analytic_samples(&read_records::<OpponentRow>(&paths.features_opponent)?),
    })
}

/// Holds out the latest `val_fraction` of matches, ordered by (date, match
/// id). Always leaves at least one match for training.
pub fn chronological_split(samples: Vec<Sample>, val_fraction: f64) -> (Vec<Sample>, Vec<Sample>) {
    let ordered: BTreeSet<_> = samples
        .iter()
        .map(|s| (date_sort_key(&s.date), s.match_id.clone()))
        .collect();
    let n = ordered.len();
    let n_val = ((n as f64) * val_fraction.clamp(0.0, 1.0)).ceil() as usize;
    let n_val = n_val.min(n.saturating_sub(1));
    let held_out: HashSet<String> = ordered
        .into_iter()
        .skip(n - n_val)
        .map(|(_, id)| id)
        .collect();
    samples
        .into_iter()
        .partition(|s| !held_out.contains(&s.match_id))
}

#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub classifier: Classifier,
}

impl TrainedModel {
    pub fn metrics(&self) -> &TrainingMetrics {
        self.classifier.metrics()
    }

    pub fn beats_baseline(&self) -> bool {
        let m = self.metrics();
        m.val_samples == 0 || m.val_log_loss < m.baseline_val_log_loss
    }
}

pub fn train_classifier(
    kind: ModelKind,
    samples: Vec<Sample>,
    settings: &TrainingSettings,
) -> Result<TrainedModel> {
    let schema = kind.schema();
    if let Some(bad) = samples.iter().find(|s| s.x.len() != schema.len()) {
        return Err(anyhow!(
            "sample for {} has {} columns, {kind} schema has {}",
            bad.match_id,
            bad.x.len(),
            schema.len()
        ));
    }
    let (train, val) = chronological_split(samples, settings.val_fraction);
    if train.is_empty() {
        return Err(anyhow!("no labelled rows to train the {kind} model"));
    }
    tracing::info!(%kind, train = train.len(), val = val.len(), "training split");

    let (means, stds) = feature_norm_stats(&train, schema.len());
    let train_z = standardize_all(&train, &means, &stds);
    let val_z = standardize_all(&val, &means, &stds);

    let priors = class_priors(&train);
    let fit = fit_softmax(&train_z, &val_z, priors, settings);

    let params = Params {
        coeffs: fit.coeffs.clone(),
        intercepts: fit.intercepts,
    };
    let metrics = TrainingMetrics {
        train_samples: train.len(),
        val_samples: val.len(),
        train_log_loss: log_loss(&params, &train_z),
        // JSON has no NaN; an empty validation set reports zeros.
        val_log_loss: if val.is_empty() { 0.0 } else { log_loss(&params, &val_z) },
        baseline_val_log_loss: if val.is_empty() {
            0.0
        } else {
            baseline_log_loss(priors, &val_z)
        },
        val_accuracy: accuracy(&params, &val_z),
        val_brier: brier(&params, &val_z),
        confusion: confusion(&params, &val_z),
        iterations: fit.iterations,
    };

    let artifact = ClassifierArtifact {
        version: ARTIFACT_VERSION,
        kind,
        generated_at: chrono::Utc::now().to_rfc3339(),
        feature_names: schema.iter().map(|s| s.to_string()).collect(),
        feature_means: means,
        feature_stds: stds,
        coeffs: fit.coeffs,
        intercepts: fit.intercepts.to_vec(),
        l2: settings.l2,
        metrics,
    };
    Ok(TrainedModel {
        classifier: Classifier::from_artifact(artifact)?,
    })
}

#[derive(Debug, Clone)]
struct Params {
    coeffs: Vec<Vec<f64>>,
    intercepts: [f64; 3],
}

impl Params {
    fn probs(&self, x: &[f64]) -> [f64; 3] {
        let mut logits = [0.0; 3];
        for (k, logit) in logits.iter_mut().enumerate() {
            *logit = self.intercepts[k] + dot(&self.coeffs[k], x);
        }
        softmax(logits)
    }
}

struct Fit {
    coeffs: Vec<Vec<f64>>,
    intercepts: [f64; 3],
    iterations: usize,
}

type Rows = Vec<(Vec<f64>, usize)>;

fn standardize_all(samples: &[Sample], means: &[f64], stds: &[f64]) -> Rows {
    samples
        .iter()
        .map(|s| {
            let x = s
                .x
                .iter()
                .enumerate()
                .map(|(i, v)| standardized(*v, means[i], stds[i]))
                .collect();
            (x, s.y.index())
        })
        .collect()
}

fn feature_norm_stats(samples: &[Sample], d: usize) -> (Vec<f64>, Vec<f64>) {
    let mut mean = vec![0.0; d];
    let mut var = vec![0.0; d];
    if samples.is_empty() {
        return (mean, vec![1.0; d]);
    }
    let n = samples.len() as f64;
    for s in samples {
        for (m, v) in mean.iter_mut().zip(&s.x) {
            *m += v;
        }
    }
    for m in &mut mean {
        *m /= n;
    }
    for s in samples {
        for i in 0..d {
            let diff = s.x[i] - mean[i];
            var[i] += diff * diff;
        }
    }
    // Constant columns keep a unit scale so they standardize to zero.
    let stds = var
        .into_iter()
        .map(|v| {
            let sd = (v / n).sqrt();
            if sd < 1e-9 { 1.0 } else { sd }
        })
        .collect();
    (mean, stds)
}

fn class_priors(samples: &[Sample]) -> [f64; 3] {
    let mut counts = [1.0; 3];
    for s in samples {
        counts[s.y.index()] += 1.0;
    }
    let total: f64 = counts.iter().sum();
    counts.map(|c| c / total)
}

fn fit_softmax(train: &Rows, val: &Rows, priors: [f64; 3], settings: &TrainingSettings) -> Fit {
    let d = train.first().map(|(x, _)| x.len()).unwrap_or(0);
    let mut params = Params {
        coeffs: vec![vec![0.0; d]; 3],
        intercepts: priors.map(f64::ln),
    };
    // Early stopping watches validation loss, or training loss when nothing
    // is held out.
    let monitor = if val.is_empty() { train } else { val };
    let mut best = params.clone();
    let mut best_loss = log_loss(&params, monitor);
    let mut no_improve = 0usize;
    let mut iterations = 0usize;
    let n = train.len().max(1) as f64;

    for iter in 0..settings.max_iters {
        iterations = iter + 1;
        let mut grad_w = vec![vec![0.0; d]; 3];
        let mut grad_b = [0.0; 3];
        for (x, y) in train {
            let p = params.probs(x);
            for k in 0..3 {
                let err = p[k] - if k == *y { 1.0 } else { 0.0 };
                grad_b[k] += err;
                for (g, xj) in grad_w[k].iter_mut().zip(x) {
                    *g += err * xj;
                }
            }
        }

        let lr = LR_START / (1.0 + iter as f64 * LR_DECAY);
        for k in 0..3 {
            for j in 0..d {
                let g = grad_w[k][j] / n + settings.l2 * params.coeffs[k][j];
                params.coeffs[k][j] -= lr * g;
            }
            params.intercepts[k] -= lr * grad_b[k] / n;
        }

        if iter % EVAL_EVERY == 0 || iter + 1 == settings.max_iters {
            let loss = log_loss(&params, monitor);
            if loss + IMPROVEMENT_EPS < best_loss {
                best_loss = loss;
                best = params.clone();
                no_improve = 0;
            } else {
                no_improve = no_improve.saturating_add(1);
                if no_improve >= PATIENCE {
                    break;
                }
            }
        }
    }

    Fit {
        coeffs: best.coeffs,
        intercepts: best.intercepts,
        iterations,
    }
}

fn log_loss(params: &Params, rows: &Rows) -> f64 {
    if rows.is_empty() {
        return f64::INFINITY;
    }
    let sum: f64 = rows
        .iter()
        .map(|(x, y)| -params.probs(x)[*y].max(1e-12).ln())
        .sum();
    sum / rows.len() as f64
}

fn baseline_log_loss(priors: [f64; 3], rows: &Rows) -> f64 {
    if rows.is_empty() {
        return f64::INFINITY;
    }
    let sum: f64 = rows.iter().map(|(_, y)| -priors[*y].max(1e-12).ln()).sum();
    sum / rows.len() as f64
}

fn argmax(p: [f64; 3]) -> usize {
    let mut best = 0;
    for k in 1..3 {
        if p[k] > p[best] {
            best = k;
        }
    }
    best
}

fn accuracy(params: &Params, rows: &Rows) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let hits = rows
        .iter()
        .filter(|(x, y)| argmax(params.probs(x)) == *y)
        .count();
    hits as f64 / rows.len() as f64
}

fn brier(params: &Params, rows: &Rows) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let sum: f64 = rows
        .iter()
        .map(|(x, y)| {
            let p = params.probs(x);
            (0..3)
                .map(|k| {
                    let t = if k == *y { 1.0 } else { 0.0 };
                    (p[k] - t).powi(2)
                })
                .sum::<f64>()
        })
        .sum();
    sum / rows.len() as f64
}

fn confusion(params: &Params, rows: &Rows) -> [[usize; 3]; 3] {
    let mut out = [[0usize; 3]; 3];
    for (x, y) in rows {
        out[*y][argmax(params.probs(x))] += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str, date: &str, x: f64, y: Outcome) -> Sample {
        Sample {
            match_id: id.into(),
            date: date.into(),
            x: vec![x],
            y,
        }
    }

    #[test]
    fn split_keeps_match_perspectives_together() {
        let mut samples = Vec::new();
        for i in 0..10 {
            let date = format!("2023-09-{:02}", i + 1);
            let id = format!("m{i}");
            samples.push(sample(&id, &date, 1.0, Outcome::Win));
            samples.push(sample(&id, &date, -1.0, Outcome::Loss));
        }
        let (train, val) = chronological_split(samples, 0.2);
        assert_eq!(train.len(), 16);
        assert_eq!(val.len(), 4);
        let val_ids: HashSet<_> = val.iter().map(|s| s.match_id.as_str()).collect();
        assert_eq!(val_ids, HashSet::from(["m8", "m9"]));
        assert!(train.iter().all(|s| !val_ids.contains(s.match_id.as_str())));
    }

    #[test]
    fn split_never_empties_training() {
        let (train, val) = chronological_split(vec![sample("m1", "2023-09-01", 0.0, Outcome::Draw)], 0.5);
        assert_eq!(train.len(), 1);
        assert!(val.is_empty());
    }

    #[test]
    fn separable_data_beats_the_prior() {
        // One column, so build samples against a single-column schema by hand.
        let mut train = Vec::new();
        for i in 0..60 {
            let x = (i % 3) as f64 - 1.0;
            let y = match i % 3 {
                0 => Outcome::Loss,
                1 => Outcome::Draw,
                _ => Outcome::Win,
            };
            train.push((vec![x * 2.0], y.index()));
        }
        let priors = [1.0 / 3.0; 3];
        let fit = fit_softmax(&train, &train, priors, &TrainingSettings::default());
        let params = Params {
            coeffs: fit.coeffs,
            intercepts: fit.intercepts,
        };
        assert!(log_loss(&params, &train) < baseline_log_loss(priors, &train));
        assert!(accuracy(&params, &train) > 0.9);
    }

    #[test]
    fn wrong_width_is_an_error() {
        let err = train_classifier(
            ModelKind::Predictive,
            vec![sample("m1", "2023-09-01", 1.0, Outcome::Win)],
            &TrainingSettings::default(),
        );
        assert!(err.is_err());
    }
}
