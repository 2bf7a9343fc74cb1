use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::features::{ANALYTIC_FEATURES, FeatureVector};
use crate::records::Outcome;
use crate::team_stats::TeamMatchRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpponentRow {
    pub match_id: String,
    pub team: String,
    pub opponent: String,
    pub season: String,
    pub date: String,
    pub is_home: u8,
    pub result: Option<Outcome>,
    pub goals: f64,
    pub shots: f64,
    pub sog: f64,
    pub assists: f64,
    pub player_count: f64,
    pub avg_player_year: f64,
    #[serde(rename = "for")]
    pub fwd: f64,
    pub mid: f64,
    #[serde(rename = "G_mean")]
    pub g_mean: f64,
    #[serde(rename = "SH_mean")]
    pub sh_mean: f64,
    #[serde(rename = "SOG_mean")]
    pub sog_mean: f64,
    #[serde(rename = "A_mean")]
    pub a_mean: f64,
    pub goal_diff: f64,
    pub shot_diff: f64,
    pub sog_diff: f64,
    pub assist_diff: f64,
    #[serde(rename = "G_mean_diff")]
    pub g_mean_diff: f64,
    #[serde(rename = "SH_mean_diff")]
    pub sh_mean_diff: f64,
    #[serde(rename = "SOG_mean_diff")]
    pub sog_mean_diff: f64,
    #[serde(rename = "A_mean_diff")]
    pub a_mean_diff: f64,
}

impl OpponentRow {
    pub fn pair(team: &TeamMatchRow, opp: &TeamMatchRow) -> Self {
        Self {
            match_id: team.match_id.clone(),
            team: team.team.clone(),
            opponent: opp.team.clone(),
            season: team.season.clone(),
            date: team.date.clone(),
            is_home: team.is_home,
            result: team.result,
            goals: team.goals,
            shots: team.shots,
            sog: team.sog,
            assists: team.assists,
            player_count: team.player_count,
            avg_player_year: team.avg_player_year.unwrap_or(0.0),
            fwd: team.fwd,
            mid: team.mid,
            g_mean: team.g_mean,
            sh_mean: team.sh_mean,
            sog_mean: team.sog_mean,
            a_mean: team.a_mean,
            goal_diff: team.goals - opp.goals,
            shot_diff: team.shots - opp.shots,
            sog_diff: team.sog - opp.sog,
            assist_diff: team.assists - opp.assists,
            g_mean_diff: team.g_mean - opp.g_mean,
            sh_mean_diff: team.sh_mean - opp.sh_mean,
            sog_mean_diff: team.sog_mean - opp.sog_mean,
            a_mean_diff: team.a_mean - opp.a_mean,
        }
    }

    pub fn feature_vector(&self) -> FeatureVector {
        let v = FeatureVector::from_pairs([
            ("shots", self.shots),
            ("sog", self.sog),
            ("assists", self.assists),
            ("player_count", self.player_count),
            ("avg_player_year", self.avg_player_year),
            ("for", self.fwd),
            ("mid", self.mid),
            ("is_home", self.is_home as f64),
            ("G_mean", self.g_mean),
            ("SH_mean", self.sh_mean),
            ("SOG_mean", self.sog_mean),
            ("A_mean", self.a_mean),
            ("shot_diff", self.shot_diff),
            ("sog_diff", self.sog_diff),
            ("assist_diff", self.assist_diff),
            ("G_mean_diff", self.g_mean_diff),
            ("SH_mean_diff", self.sh_mean_diff),
            ("SOG_mean_diff", self.sog_mean_diff),
            ("A_mean_diff", self.a_mean_diff),
        ]);
        debug_assert_eq!(v.len(), ANALYTIC_FEATURES.len());
        v
    }
}

pub fn analytic_vector(team: &TeamMatchRow, opp: &TeamMatchRow) -> FeatureVector {
    OpponentRow::pair(team, opp).feature_vector()
}

pub fn build_opponent_rows(rows: &[TeamMatchRow]) -> Vec<OpponentRow> {
    let mut by_match: HashMap<&str, Vec<&TeamMatchRow>> = HashMap::new();
    for r in rows {
        by_match.entry(r.match_id.as_str()).or_default().push(r);
    }
    let mut out = Vec::with_capacity(rows.len());
    for r in rows {
        let Some(sides) = by_match.get(r.match_id.as_str()) else {
            continue;
        };
        for opp in sides.iter().filter(|o| o.team != r.team) {
            out.push(OpponentRow::pair(r, opp));
        }
    }
    out
}
