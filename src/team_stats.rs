use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::normalize::PositionGroup;
use crate::records::{BoxscoreRow, LineupRow, MatchRecord, Outcome};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RosterEntry {
    pub year_num: u8,
    pub group: PositionGroup,
}

#[derive(Debug, Clone, Default)]
pub struct RosterIndex {
    by_key: HashMap<(String, String), Vec<(String, RosterEntry)>>,
}

impl RosterIndex {
    pub fn new(lineups: &[LineupRow]) -> Self {
        let mut by_key: HashMap<(String, String), Vec<(String, RosterEntry)>> = HashMap::new();
        for row in lineups {
            by_key
                .entry((row.team.clone(), row.player.clone()))
                .or_default()
                .push((
                    row.season.clone(),
                    RosterEntry {
                        year_num: row.year_num,
                        group: row.position_group,
                    },
                ));
        }
        Self { by_key }
    }

    pub fn lookup(&self, season: &str, team: &str, player: &str) -> Option<RosterEntry> {
        let entries = self.by_key.get(&(team.to_string(), player.to_string()))?;
        entries
            .iter()
            .find(|(s, _)| s == season)
            .or_else(|| entries.last())
            .map(|(_, e)| *e)
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineupAggregate {
    pub goals: f64,
    pub shots: f64,
    pub sog: f64,
    pub assists: f64,
    pub player_count: f64,
    pub avg_player_year: Option<f64>,
    pub shares: [f64; 5],
    pub g_mean: f64,
    pub g_max: f64,
    pub sh_mean: f64,
    pub sog_mean: f64,
    pub a_mean: f64,
}

impl LineupAggregate {
    pub fn share(&self, group: PositionGroup) -> f64 {
        let idx = PositionGroup::ALL
            .iter()
            .position(|g| *g == group)
            .unwrap_or(PositionGroup::ALL.len() - 1);
        self.shares[idx]
    }
}

pub fn aggregate_lineup(players: &[BoxscoreRow], season: &str, roster: &RosterIndex) -> LineupAggregate {
    let mut out = LineupAggregate::default();
    if players.is_empty() {
        return out;
    }

    let mut g_max = f64::MIN;
    let mut year_sum = 0.0;
    let mut year_n = 0usize;
    let mut group_counts = [0usize; 5];
    let mut grouped = 0usize;

    for p in players {
        out.goals += p.goals;
        out.shots += p.shots;
        out.sog += p.sog;
        out.assists += p.assists;
        g_max = g_max.max(p.goals);

        if let Some(entry) = roster.lookup(season, &p.team, &p.player) {
            if entry.year_num > 0 {
                year_sum += entry.year_num as f64;
                year_n += 1;
            }
            if let Some(idx) = PositionGroup::ALL.iter().position(|g| *g == entry.group) {
                group_counts[idx] += 1;
                grouped += 1;
            }
        }
    }

    let n = players.len() as f64;
    out.player_count = n;
    out.g_mean = out.goals / n;
    out.g_max = g_max;
    out.sh_mean = out.shots / n;
    out.sog_mean = out.sog / n;
    out.a_mean = out.assists / n;
    out.avg_player_year = (year_n > 0).then(|| year_sum / year_n as f64);
    if grouped > 0 {
        for (share, count) in out.shares.iter_mut().zip(group_counts) {
            *share = count as f64 / grouped as f64;
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMatchRow {
    pub match_id: String,
    pub team: String,
    pub season: String,
    pub date: String,
    pub home_team: String,
    pub away_team: String,
    pub is_home: u8,
    pub result: Option<Outcome>,
    pub goals: f64,
    pub shots: f64,
    pub sog: f64,
    pub assists: f64,
    pub player_count: f64,
    pub avg_player_year: Option<f64>,
    pub gk: f64,
    pub def: f64,
    pub mid: f64,
    #[serde(rename = "for")]
    pub fwd: f64,
    pub unk: f64,
    #[serde(rename = "G_sum")]
    pub g_sum: f64,
    #[serde(rename = "G_mean")]
    pub g_mean: f64,
    #[serde(rename = "G_max")]
    pub g_max: f64,
    #[serde(rename = "SH_sum")]
    pub sh_sum: f64,
    #[serde(rename = "SH_mean")]
    pub sh_mean: f64,
    #[serde(rename = "SOG_sum")]
    pub sog_sum: f64,
    #[serde(rename = "SOG_mean")]
    pub sog_mean: f64,
    #[serde(rename = "A_sum")]
    pub a_sum: f64,
    #[serde(rename = "A_mean")]
    pub a_mean: f64,
    pub player_count_match: f64,
}

impl TeamMatchRow {
    pub fn new(m: &MatchRecord, team: &str, is_home: bool, agg: &LineupAggregate) -> Self {
        let mut row = Self {
            match_id: m.match_id.clone(),
            team: team.to_string(),
            season: m.season.clone(),
            date: m.date.clone(),
            home_team: m.home_team.clone(),
            away_team: m.away_team.clone(),
            is_home: u8::from(is_home),
            result: m.outcome_for(is_home),
            goals: 0.0,
            shots: 0.0,
            sog: 0.0,
            assists: 0.0,
            player_count: 0.0,
            avg_player_year: None,
            gk: 0.0,
            def: 0.0,
            mid: 0.0,
            fwd: 0.0,
            unk: 0.0,
            g_sum: 0.0,
            g_mean: 0.0,
            g_max: 0.0,
            sh_sum: 0.0,
            sh_mean: 0.0,
            sog_sum: 0.0,
            sog_mean: 0.0,
            a_sum: 0.0,
            a_mean: 0.0,
            player_count_match: 0.0,
        };
        row.apply_aggregate(agg);
        row
    }

    pub fn apply_aggregate(&mut self, agg: &LineupAggregate) {
        self.goals = agg.goals;
        self.shots = agg.shots;
        self.sog = agg.sog;
        self.assists = agg.assists;
        self.player_count = agg.player_count;
        self.avg_player_year = agg.avg_player_year;
        self.gk = agg.share(PositionGroup::Gk);
        self.def = agg.share(PositionGroup::Def);
        self.mid = agg.share(PositionGroup::Mid);
        self.fwd = agg.share(PositionGroup::For);
        self.unk = agg.share(PositionGroup::Unk);
        self.g_sum = agg.goals;
        self.g_mean = agg.g_mean;
        self.g_max = agg.g_max;
        self.sh_sum = agg.shots;
        self.sh_mean = agg.sh_mean;
        self.sog_sum = agg.sog;
        self.sog_mean = agg.sog_mean;
        self.a_sum = agg.assists;
        self.a_mean = agg.a_mean;
        self.player_count_match = agg.player_count;
    }

    pub fn is_home(&self) -> bool {
        self.is_home == 1
    }
}

pub fn build_team_match_rows(
    matches: &[MatchRecord],
    boxscores: &[BoxscoreRow],
    lineups: &[LineupRow],
) -> Vec<TeamMatchRow> {
    let by_match: HashMap<&str, &MatchRecord> =
        matches.iter().map(|m| (m.match_id.as_str(), m)).collect();
    let roster = RosterIndex::new(lineups);

    let mut groups: BTreeMap<(&str, &str), Vec<BoxscoreRow>> = BTreeMap::new();
    for row in boxscores {
        groups
            .entry((row.match_id.as_str(), row.team.as_str()))
            .or_default()
            .push(row.clone());
    }
    let groups: Vec<((&str, &str), Vec<BoxscoreRow>)> = groups.into_iter().collect();

    let rows: Vec<TeamMatchRow> = groups
        .par_iter()
        .filter_map(|((match_id, team), players)| {
            let m = by_match.get(match_id)?;
            let is_home = m.is_home(team)?;
            let agg = aggregate_lineup(players, &m.season, &roster);
            Some(TeamMatchRow::new(m, team, is_home, &agg))
        })
        .collect();

    let dropped = groups.len() - rows.len();
    if dropped > 0 {
        tracing::info!(dropped, "team-match groups without a matching fixture dropped");
    }
    rows
}
