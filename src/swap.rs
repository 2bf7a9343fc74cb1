use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

use crate::features::{ANALYTIC_FEATURES, FeatureDelta, FeatureVector, feature_deltas};
use crate::model::{Classifier, Prediction};
use crate::opponent::analytic_vector;
use crate::records::{BoxscoreRow, LineupRow, PlayerStats};
use crate::table::write_atomic;
use crate::team_stats::{RosterIndex, TeamMatchRow, aggregate_lineup};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    pub match_id: String,
    pub team: String,
    pub swap_out: String,
    pub swap_in: String,
}

impl SwapRequest {
    pub fn is_identity(&self) -> bool {
        self.swap_out == self.swap_in
    }
}

#[derive(Debug, Clone)]
pub struct SwapReport {
    pub request: SwapRequest,
    pub opponent: TeamMatchRow,
    pub team_before: TeamMatchRow,
    pub team_after: TeamMatchRow,
    pub before: Prediction,
    pub after: Prediction,
    pub features_before: FeatureVector,
    pub features_after: FeatureVector,
    pub deltas: Vec<FeatureDelta>,
    /// `None` when the incoming player has no other match for this team.
    pub incoming: Option<PlayerStats>,
    pub means_before: PlayerStats,
    pub means_after: PlayerStats,
}

impl SwapReport {
    pub fn max_abs_delta(&self) -> f64 {
        self.deltas
            .iter()
            .map(|d| d.change().abs())
            .fold(0.0, f64::max)
    }
}

type MatchTeam = (String, String);

#[derive(Debug, Clone, Default)]
pub struct SwapSimulator {
    lineups: HashMap<MatchTeam, Vec<BoxscoreRow>>,
    rows: HashMap<MatchTeam, TeamMatchRow>,
    by_team: HashMap<String, Vec<BoxscoreRow>>,
    roster: RosterIndex,
}

impl SwapSimulator {
    pub fn new(enriched: &[TeamMatchRow], boxscores: &[BoxscoreRow], lineups: &[LineupRow]) -> Self {
        let mut by_match: HashMap<MatchTeam, Vec<BoxscoreRow>> = HashMap::new();
        let mut by_team: HashMap<String, Vec<BoxscoreRow>> = HashMap::new();
        for row in boxscores {
            by_match
                .entry((row.match_id.clone(), row.team.clone()))
                .or_default()
                .push(row.clone());
            by_team.entry(row.team.clone()).or_default().push(row.clone());
        }
        let rows = enriched
            .iter()
            .map(|r| ((r.match_id.clone(), r.team.clone()), r.clone()))
            .collect();
        Self {
            lineups: by_match,
            rows,
            by_team,
            roster: RosterIndex::new(lineups),
        }
    }

    fn key(match_id: &str, team: &str) -> MatchTeam {
        (match_id.to_string(), team.to_string())
    }

    pub fn lineup(&self, match_id: &str, team: &str) -> &[BoxscoreRow] {
        self.lineups
            .get(&Self::key(match_id, team))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn team_row(&self, match_id: &str, team: &str) -> Option<&TeamMatchRow> {
        self.rows.get(&Self::key(match_id, team))
    }

    pub fn opponent_row(&self, match_id: &str, team: &str) -> Option<&TeamMatchRow> {
        let own = self.team_row(match_id, team)?;
        let opp = if own.is_home() { &own.away_team } else { &own.home_team };
        self.team_row(match_id, opp)
    }

    pub fn swap_in_candidates(&self, match_id: &str, team: &str) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .by_team
            .get(team)
            .into_iter()
            .flatten()
            .filter(|r| r.match_id != match_id)
            .map(|r| r.player.as_str())
            .collect();
        set.into_iter().map(str::to_string).collect()
    }

    pub fn incoming_stats(&self, match_id: &str, team: &str, player: &str) -> Option<PlayerStats> {
        let stats: Vec<PlayerStats> = self
            .by_team
            .get(team)
            .into_iter()
            .flatten()
            .filter(|r| r.match_id != match_id && r.player == player)
            .map(BoxscoreRow::stats)
            .collect();
        PlayerStats::mean_of(&stats)
    }

    pub fn simulate(&self, model: &Classifier, req: &SwapRequest) -> Result<SwapReport> {
        let lineup = self.lineup(&req.match_id, &req.team);
        if lineup.is_empty() {
            return Err(anyhow!(
                "no player data for {} in {}",
                req.team,
                req.match_id
            ));
        }
        let stored = self
            .team_row(&req.match_id, &req.team)
            .ok_or_else(|| anyhow!("no enriched row for {} in {}", req.team, req.match_id))?;
        let opponent = self
            .opponent_row(&req.match_id, &req.team)
            .ok_or_else(|| anyhow!("no opponent row for {} in {}", req.team, req.match_id))?;
        if !lineup.iter().any(|p| p.player == req.swap_out) {
            return Err(anyhow!(
                "{} did not play for {} in {}",
                req.swap_out,
                req.team,
                req.match_id
            ));
        }

        let incoming = self.incoming_stats(&req.match_id, &req.team, &req.swap_in);
        let swapped: Vec<BoxscoreRow> = if req.is_identity() {
            lineup.to_vec()
        } else {
            let stats = incoming.unwrap_or_default();
            lineup
                .iter()
                .map(|p| {
                    let mut p = p.clone();
                    if p.player == req.swap_out {
                        p.player = req.swap_in.clone();
                        p.set_stats(stats);
                    }
                    p
                })
                .collect()
        };

        // Both sides go through the same aggregation so an identity swap is
        // exactly zero.
        let mut team_before = stored.clone();
        team_before.apply_aggregate(&aggregate_lineup(lineup, &stored.season, &self.roster));
        let mut team_after = stored.clone();
        team_after.apply_aggregate(&aggregate_lineup(&swapped, &stored.season, &self.roster));

        let features_before = analytic_vector(&team_before, opponent);
        let features_after = analytic_vector(&team_after, opponent);
        let deltas = feature_deltas(&features_before, &features_after, &ANALYTIC_FEATURES);

        let means = |rows: &[BoxscoreRow]| {
            let stats: Vec<PlayerStats> = rows.iter().map(BoxscoreRow::stats).collect();
            PlayerStats::mean_of(&stats).unwrap_or_default()
        };

        tracing::debug!(
            match_id = %req.match_id,
            team = %req.team,
            swap_out = %req.swap_out,
            swap_in = %req.swap_in,
            has_history = incoming.is_some(),
            "swap simulated"
        );

        Ok(SwapReport {
            request: req.clone(),
            opponent: opponent.clone(),
            before: model.predict(&features_before),
            after: model.predict(&features_after),
            team_before,
            team_after,
            features_before,
            features_after,
            deltas,
            incoming,
            means_before: means(lineup),
            means_after: means(&swapped),
        })
    }
}

fn file_token(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

pub fn scenario_file_name(req: &SwapRequest, timestamp: &str) -> String {
    format!(
        "{}__{}__{}_to_{}__{}.csv",
        file_token(&req.match_id),
        file_token(&req.team),
        file_token(&req.swap_out),
        file_token(&req.swap_in),
        timestamp
    )
}

fn unused_scenario_path(dir: &Path, req: &SwapRequest, timestamp: &str) -> PathBuf {
    let base = scenario_file_name(req, timestamp);
    let mut path = dir.join(&base);
    let stem = base.trim_end_matches(".csv");
    let mut n = 2;
    while path.exists() {
        path = dir.join(format!("{stem}_{n}.csv"));
        n += 1;
    }
    path
}

pub fn save_scenario(dir: &Path, report: &SwapReport) -> Result<PathBuf> {
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let path = unused_scenario_path(dir, &report.request, &ts);

    let mut header: Vec<String> = ["match_id", "team", "swap_out", "swap_in"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let req = &report.request;
    let mut values: Vec<String> = vec![
        req.match_id.clone(),
        req.team.clone(),
        req.swap_out.clone(),
        req.swap_in.clone(),
    ];
    for (prefix, pred) in [("prob_before", &report.before), ("prob_after", &report.after)] {
        for outcome in crate::records::Outcome::CLASSES {
            header.push(format!("{prefix}_{}", outcome.label().to_lowercase()));
            values.push(format!("{:.6}", pred.probs.get(outcome)));
        }
    }
    for (prefix, stats) in [("orig_mean", report.means_before), ("new_mean", report.means_after)] {
        for (name, v) in PlayerStats::NAMES.iter().zip(stats.as_array()) {
            header.push(format!("{prefix}_{}", name.to_lowercase()));
            values.push(format!("{v:.6}"));
        }
    }

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(&header)?;
    wtr.write_record(&values)?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| anyhow!("flush scenario csv: {}", e.error()))?;
    write_atomic(&path, &bytes)?;
    tracing::info!(path = %path.display(), "swap scenario saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_sanitized() {
        let req = SwapRequest {
            match_id: "m1".into(),
            team: "ubc-okanagan".into(),
            swap_out: "ann lee".into(),
            swap_in: "bo o'neil".into(),
        };
        assert_eq!(
            scenario_file_name(&req, "20240101_120000"),
            "m1__ubc-okanagan__ann_lee_to_bo_o_neil__20240101_120000.csv"
        );
    }

    #[test]
    fn same_second_saves_get_distinct_names() {
        let dir = std::env::temp_dir().join(format!("canwest_swap_names_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let req = SwapRequest {
            match_id: "m1".into(),
            team: "ubc".into(),
            swap_out: "a".into(),
            swap_in: "b".into(),
        };
        let first = unused_scenario_path(&dir, &req, "20240101_120000");
        std::fs::write(&first, "x").unwrap();
        let second = unused_scenario_path(&dir, &req, "20240101_120000");
        std::fs::write(&second, "x").unwrap();
        let third = unused_scenario_path(&dir, &req, "20240101_120000");
        assert_eq!(first.file_name().unwrap(), "m1__ubc__a_to_b__20240101_120000.csv");
        assert_eq!(second.file_name().unwrap(), "m1__ubc__a_to_b__20240101_120000_2.csv");
        assert_eq!(third.file_name().unwrap(), "m1__ubc__a_to_b__20240101_120000_3.csv");
    }
}
