use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::config::DataPaths;
use crate::model::{Classifier, ModelKind, Prediction};
use crate::prematch::{FormRow, latest_form_by_team, predictive_vector};
use crate::records::{BoxscoreRow, LineupRow};
use crate::swap::{SwapReport, SwapRequest, SwapSimulator, save_scenario};
use crate::table::read_records;
use crate::team_stats::TeamMatchRow;

#[derive(Debug, Clone)]
pub struct MatchPrediction {
    pub home: FormRow,
    pub away: FormRow,
    pub prediction: Prediction,
}

#[derive(Debug, Clone, Default)]
pub struct Workspace {
    enriched: Vec<TeamMatchRow>,
    latest_form: BTreeMap<String, FormRow>,
    swap: SwapSimulator,
    predictive: Option<Classifier>,
    analytic: Option<Classifier>,
    scenario_dir: PathBuf,
}

impl Workspace {
    pub fn from_parts(
        enriched: Vec<TeamMatchRow>,
        prematch: &[FormRow],
        boxscores: &[BoxscoreRow],
        lineups: &[LineupRow],
        predictive: Option<Classifier>,
        analytic: Option<Classifier>,
        scenario_dir: PathBuf,
    ) -> Self {
        let swap = SwapSimulator::new(&enriched, boxscores, lineups);
        Self {
            latest_form: latest_form_by_team(prematch),
            enriched,
            swap,
            predictive,
            analytic,
            scenario_dir,
        }
    }

    pub fn load(paths: &DataPaths) -> Result<Self> {
        let enriched: Vec<TeamMatchRow> = read_records(&paths.features_enriched)
            .context("feature files missing; run build_features first")?;
        let prematch: Vec<FormRow> = read_records(&paths.features_prematch)
            .context("feature files missing; run build_features first")?;
        let boxscores: Vec<BoxscoreRow> = read_records(&paths.boxscores_clean)?;
        let lineups: Vec<LineupRow> = if paths.lineups_clean.exists() {
            read_records(&paths.lineups_clean)?
        } else {
            Vec::new()
        };
        let predictive = load_model(&paths.predictive_model, ModelKind::Predictive);
        let analytic = load_model(&paths.analytic_model, ModelKind::Analytic);
        tracing::info!(
            enriched = enriched.len(),
            prematch = prematch.len(),
            boxscores = boxscores.len(),
            predictive = predictive.is_some(),
            analytic = analytic.is_some(),
            "workspace loaded"
        );
        Ok(Self::from_parts(
            enriched,
            &prematch,
            &boxscores,
            &lineups,
            predictive,
            analytic,
            paths.swap_scenarios.clone(),
        ))
    }

    pub fn has_model(&self, kind: ModelKind) -> bool {
        match kind {
            ModelKind::Predictive => self.predictive.is_some(),
            ModelKind::Analytic => self.analytic.is_some(),
        }
    }

    pub fn teams(&self) -> Vec<String> {
        self.latest_form.keys().cloned().collect()
    }

    pub fn form(&self, team: &str) -> Option<&FormRow> {
        self.latest_form.get(team)
    }

    pub fn predict_match(&self, home: &str, away: &str) -> Result<MatchPrediction> {
        if home == away {
            return Err(anyhow!("pick two different teams"));
        }
        let model = self
            .predictive
            .as_ref()
            .ok_or_else(|| anyhow!("predictive model not trained"))?;
        let (Some(h), Some(a)) = (self.form(home), self.form(away)) else {
            return Err(anyhow!("no valid data for this selection"));
        };
        let prediction = model.predict(&predictive_vector(h, a, true));
        Ok(MatchPrediction {
            home: h.clone(),
            away: a.clone(),
            prediction,
        })
    }

    pub fn match_ids(&self) -> Vec<String> {
        let ids: BTreeSet<&str> = self.enriched.iter().map(|r| r.match_id.as_str()).collect();
        ids.into_iter().rev().map(str::to_string).collect()
    }

    pub fn teams_in_match(&self, match_id: &str) -> Vec<String> {
        let teams: BTreeSet<&str> = self
            .enriched
            .iter()
            .filter(|r| r.match_id == match_id)
            .map(|r| r.team.as_str())
            .collect();
        teams.into_iter().map(str::to_string).collect()
    }

    pub fn lineup(&self, match_id: &str, team: &str) -> &[BoxscoreRow] {
        self.swap.lineup(match_id, team)
    }

    pub fn lineup_players(&self, match_id: &str, team: &str) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.lineup(match_id, team)
            .iter()
            .filter(|p| seen.insert(p.player.as_str()))
            .map(|p| p.player.clone())
            .collect()
    }

    pub fn swap_in_candidates(&self, match_id: &str, team: &str) -> Vec<String> {
        self.swap.swap_in_candidates(match_id, team)
    }

    pub fn simulate_swap(&self, req: &SwapRequest) -> Result<SwapReport> {
        let model = self
            .analytic
            .as_ref()
            .ok_or_else(|| anyhow!("analytic model not trained"))?;
        self.swap.simulate(model, req)
    }

    pub fn save_scenario(&self, report: &SwapReport) -> Result<PathBuf> {
        save_scenario(&self.scenario_dir, report)
    }

    pub fn scenario_dir(&self) -> &Path {
        &self.scenario_dir
    }
}

fn load_model(path: &Path, kind: ModelKind) -> Option<Classifier> {
    if !path.exists() {
        tracing::warn!(%kind, path = %path.display(), "model artifact missing");
        return None;
    }
    match Classifier::load(path) {
        Ok(model) if model.kind() == kind => Some(model),
        Ok(model) => {
            tracing::warn!(expected = %kind, found = %model.kind(), "model artifact has the wrong kind");
            None
        }
        Err(err) => {
            tracing::warn!(%kind, "model artifact unusable: {err:#}");
            None
        }
    }
}
