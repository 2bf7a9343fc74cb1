use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::features::{ANALYTIC_FEATURES, FeatureVector, PREDICTIVE_FEATURES};
use crate::records::Outcome;
use crate::table::write_atomic;

pub const ARTIFACT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Predictive,
    Analytic,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::Predictive, ModelKind::Analytic];

    pub fn schema(self) -> &'static [&'static str] {
        match self {
            ModelKind::Predictive => &PREDICTIVE_FEATURES,
            ModelKind::Analytic => &ANALYTIC_FEATURES,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::Predictive => "predictive",
            ModelKind::Analytic => "analytic",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "predictive" | "prematch" => Ok(ModelKind::Predictive),
            "analytic" | "postmatch" => Ok(ModelKind::Analytic),
            other => Err(anyhow!("unknown model kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    #[serde(default)]
    pub train_samples: usize,
    #[serde(default)]
    pub val_samples: usize,
    #[serde(default)]
    pub train_log_loss: f64,
    #[serde(default)]
    pub val_log_loss: f64,
    #[serde(default)]
    pub baseline_val_log_loss: f64,
    #[serde(default)]
    pub val_accuracy: f64,
    #[serde(default)]
    pub val_brier: f64,
    /// Rows are true class, columns predicted, both in `Outcome::CLASSES` order.
    #[serde(default)]
    pub confusion: [[usize; 3]; 3],
    #[serde(default)]
    pub iterations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierArtifact {
    pub version: u32,
    pub kind: ModelKind,
    pub generated_at: String,
    pub feature_names: Vec<String>,
    pub feature_means: Vec<f64>,
    pub feature_stds: Vec<f64>,
    pub coeffs: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
    #[serde(default)]
    pub l2: f64,
    #[serde(default)]
    pub metrics: TrainingMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeProbs {
    pub win: f64,
    pub draw: f64,
    pub loss: f64,
}

impl OutcomeProbs {
    pub fn from_array(p: [f64; 3]) -> Self {
        Self {
            win: p[0],
            draw: p[1],
            loss: p[2],
        }
    }

    pub fn as_array(self) -> [f64; 3] {
        [self.win, self.draw, self.loss]
    }

    pub fn get(self, outcome: Outcome) -> f64 {
        self.as_array()[outcome.index()]
    }

    pub fn argmax(self) -> Outcome {
        let p = self.as_array();
        let mut best = 0;
        for i in 1..3 {
            if p[i] > p[best] {
                best = i;
            }
        }
        Outcome::CLASSES[best]
    }

    pub fn sum(self) -> f64 {
        self.win + self.draw + self.loss
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub probs: OutcomeProbs,
    pub label: Outcome,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    artifact: ClassifierArtifact,
}

impl Classifier {
    pub fn from_artifact(artifact: ClassifierArtifact) -> Result<Self> {
        let d = artifact.feature_names.len();
        if artifact.feature_means.len() != d || artifact.feature_stds.len() != d {
            return Err(anyhow!("standardization stats do not match {d} features"));
        }
        if artifact.coeffs.len() != 3 || artifact.intercepts.len() != 3 {
            return Err(anyhow!("expected 3 classes, got {}", artifact.coeffs.len()));
        }
        if artifact.coeffs.iter().any(|row| row.len() != d) {
            return Err(anyhow!("coefficient rows do not match {d} features"));
        }
        Ok(Self { artifact })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read model artifact {}", path.display()))?;
        let artifact = serde_json::from_str::<ClassifierArtifact>(&raw)
            .with_context(|| format!("parse model artifact {}", path.display()))?;
        Self::from_artifact(artifact).with_context(|| format!("invalid artifact {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.artifact).context("serialize artifact")?;
        write_atomic(path, raw.as_bytes())
    }

    pub fn artifact(&self) -> &ClassifierArtifact {
        &self.artifact
    }

    pub fn kind(&self) -> ModelKind {
        self.artifact.kind
    }

    pub fn feature_names(&self) -> &[String] {
        &self.artifact.feature_names
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.artifact.metrics
    }

    pub fn predict(&self, features: &FeatureVector) -> Prediction {
        let raw = features.aligned(&self.artifact.feature_names);
        let probs = OutcomeProbs::from_array(self.predict_raw(&raw));
        Prediction {
            probs,
            label: probs.argmax(),
        }
    }

    pub fn predict_raw(&self, raw: &[f64]) -> [f64; 3] {
        let a = &self.artifact;
        let x: Vec<f64> = raw
            .iter()
            .enumerate()
            .map(|(i, v)| standardized(*v, a.feature_means[i], a.feature_stds[i]))
            .collect();
        let mut logits = [0.0; 3];
        for (k, logit) in logits.iter_mut().enumerate() {
            *logit = a.intercepts[k] + dot(&a.coeffs[k], &x);
        }
        softmax(logits)
    }
}

pub fn standardized(x: f64, mean: f64, std: f64) -> f64 {
    (x - mean) / std.max(1e-6)
}

pub fn softmax(logits: [f64; 3]) -> [f64; 3] {
    let mx = logits[0].max(logits[1].max(logits[2]));
    let e = logits.map(|l| (l - mx).exp());
    let den = (e[0] + e[1] + e[2]).max(1e-12);
    e.map(|v| v / den)
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
