use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::features::{FeatureVector, PREDICTIVE_FEATURES, ROLLING_STATS};
use crate::records::{Outcome, date_sort_key};
use crate::team_stats::TeamMatchRow;

pub const FORM_WINDOW: usize = 3;
pub const RESULT_WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormRow {
    pub match_id: String,
    pub season: String,
    pub team: String,
    pub date: String,
    pub home_team: String,
    pub away_team: String,
    pub is_home: u8,
    pub result: Option<Outcome>,
    pub shots_rolling3: f64,
    pub sog_rolling3: f64,
    pub assists_rolling3: f64,
    pub player_count_rolling3: f64,
    pub avg_player_year_rolling3: f64,
    pub shots_form_diff: f64,
    pub sog_form_diff: f64,
    pub assists_form_diff: f64,
    pub player_count_form_diff: f64,
    pub avg_player_year_form_diff: f64,
    pub win_rate_diff: f64,
    pub win_rate_rolling5: f64,
    pub player_count: f64,
    #[serde(rename = "for")]
    pub fwd: f64,
    pub mid: f64,
}

impl FormRow {
    pub fn rolling(&self) -> [f64; 5] {
        [
            self.shots_rolling3,
            self.sog_rolling3,
            self.assists_rolling3,
            self.player_count_rolling3,
            self.avg_player_year_rolling3,
        ]
    }

    pub fn feature_vector(&self) -> FeatureVector {
        let v = FeatureVector::from_pairs([
            ("shots_rolling3", self.shots_rolling3),
            ("sog_rolling3", self.sog_rolling3),
            ("assists_rolling3", self.assists_rolling3),
            ("player_count_rolling3", self.player_count_rolling3),
            ("avg_player_year_rolling3", self.avg_player_year_rolling3),
            ("win_rate_rolling5", self.win_rate_rolling5),
            ("is_home", self.is_home as f64),
            ("for", self.fwd),
            ("mid", self.mid),
            ("shots_form_diff", self.shots_form_diff),
            ("sog_form_diff", self.sog_form_diff),
            ("assists_form_diff", self.assists_form_diff),
            ("player_count_form_diff", self.player_count_form_diff),
            ("avg_player_year_form_diff", self.avg_player_year_form_diff),
            ("win_rate_diff", self.win_rate_diff),
        ]);
        debug_assert_eq!(v.len(), PREDICTIVE_FEATURES.len());
        v
    }
}

pub fn predictive_vector(team: &FormRow, opponent: &FormRow, is_home: bool) -> FeatureVector {
    let mut v = FeatureVector::new();
    let own = team.rolling();
    let opp = opponent.rolling();
    for (i, stat) in ROLLING_STATS.iter().enumerate() {
        v.set(&format!("{stat}_rolling3"), own[i]);
        v.set(&format!("{stat}_form_diff"), own[i] - opp[i]);
    }
    v.set("win_rate_rolling5", team.win_rate_rolling5);
    v.set("win_rate_diff", team.win_rate_rolling5 - opponent.win_rate_rolling5);
    v.set("is_home", if is_home { 1.0 } else { 0.0 });
    v.set("for", team.fwd);
    v.set("mid", team.mid);
    v
}

#[derive(Debug, Clone)]
struct Rolling {
    idx: usize,
    stats: [Option<f64>; 5],
    win_rate: Option<f64>,
}

fn stat_values(row: &TeamMatchRow) -> [Option<f64>; 5] {
    [
        Some(row.shots),
        Some(row.sog),
        Some(row.assists),
        Some(row.player_count),
        row.avg_player_year,
    ]
}

fn trailing_mean<I: Iterator<Item = Option<f64>>>(values: I) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values.flatten() {
        sum += v;
        n += 1;
    }
    (n > 0).then(|| sum / n as f64)
}

fn rolling_for_group(rows: &[TeamMatchRow], order: &[usize]) -> Vec<Rolling> {
    let mut out = Vec::with_capacity(order.len());
    for (pos, &idx) in order.iter().enumerate() {
        let form_start = pos.saturating_sub(FORM_WINDOW);
        let result_start = pos.saturating_sub(RESULT_WINDOW);
        let prev = &order[form_start..pos];

        let mut stats = [None; 5];
        for (k, slot) in stats.iter_mut().enumerate() {
            *slot = trailing_mean(prev.iter().map(|&i| stat_values(&rows[i])[k]));
        }
        // A missing label scores as a draw.
        let win_rate = trailing_mean(order[result_start..pos].iter().map(|&i| {
            Some(rows[i].result.map(Outcome::result_points).unwrap_or(0.5))
        }));
        out.push(Rolling {
            idx,
            stats,
            win_rate,
        });
    }
    out
}

// Team mean across seasons first; the league mean is taken after that pass.
fn fill_gaps(rows: &[TeamMatchRow], rolling: &mut [Rolling]) {
    fn slot(r: &mut Rolling, k: usize) -> &mut Option<f64> {
        if k < 5 { &mut r.stats[k] } else { &mut r.win_rate }
    }
    let mean = |(sum, n): (f64, usize)| (n > 0).then(|| sum / n as f64);

    let mut team_acc: HashMap<String, [(f64, usize); 6]> = HashMap::new();
    for r in rolling.iter_mut() {
        let acc = team_acc
            .entry(rows[r.idx].team.clone())
            .or_insert([(0.0, 0); 6]);
        for (k, a) in acc.iter_mut().enumerate() {
            if let Some(v) = *slot(r, k) {
                a.0 += v;
                a.1 += 1;
            }
        }
    }
    for r in rolling.iter_mut() {
        let Some(acc) = team_acc.get(&rows[r.idx].team) else { continue };
        for (k, a) in acc.iter().enumerate() {
            let s = slot(r, k);
            if s.is_none() {
                *s = mean(*a);
            }
        }
    }

    let mut global = [(0.0, 0usize); 6];
    for r in rolling.iter_mut() {
        for (k, g) in global.iter_mut().enumerate() {
            if let Some(v) = *slot(r, k) {
                g.0 += v;
                g.1 += 1;
            }
        }
    }
    for r in rolling.iter_mut() {
        for (k, g) in global.iter().enumerate() {
            let s = slot(r, k);
            if s.is_none() {
                *s = Some(mean(*g).unwrap_or(0.0));
            }
        }
    }
}

pub fn build_prematch_rows(rows: &[TeamMatchRow]) -> Vec<FormRow> {
    let mut groups: BTreeMap<(&str, &str), Vec<usize>> = BTreeMap::new();
    for (i, r) in rows.iter().enumerate() {
        groups
            .entry((r.season.as_str(), r.team.as_str()))
            .or_default()
            .push(i);
    }
    let groups: Vec<Vec<usize>> = groups
        .into_values()
        .map(|mut idxs| {
            idxs.sort_by(|&a, &b| {
                date_sort_key(&rows[a].date)
                    .cmp(&date_sort_key(&rows[b].date))
                    .then_with(|| rows[a].match_id.cmp(&rows[b].match_id))
            });
            idxs
        })
        .collect();

    let mut rolling: Vec<Rolling> = groups
        .par_iter()
        .flat_map_iter(|order| rolling_for_group(rows, order))
        .collect();
    fill_gaps(rows, &mut rolling);

    let mut by_idx: Vec<Option<&Rolling>> = vec![None; rows.len()];
    for r in &rolling {
        by_idx[r.idx] = Some(r);
    }
    let mut by_match: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, r) in rows.iter().enumerate() {
        by_match.entry(r.match_id.as_str()).or_default().push(i);
    }

    let value = |r: &Rolling, k: usize| r.stats[k].unwrap_or(0.0);
    let mut out = Vec::with_capacity(rows.len());
    for r in &rolling {
        let row = &rows[r.idx];
        let Some(sides) = by_match.get(row.match_id.as_str()) else {
            continue;
        };
        for &opp_idx in sides.iter().filter(|&&i| rows[i].team != row.team) {
            let Some(opp) = by_idx[opp_idx] else { continue };
            let win_rate = r.win_rate.unwrap_or(0.0);
            out.push(FormRow {
                match_id: row.match_id.clone(),
                season: row.season.clone(),
                team: row.team.clone(),
                date: row.date.clone(),
                home_team: row.home_team.clone(),
                away_team: row.away_team.clone(),
                is_home: row.is_home,
                result: row.result,
                shots_rolling3: value(r, 0),
                sog_rolling3: value(r, 1),
                assists_rolling3: value(r, 2),
                player_count_rolling3: value(r, 3),
                avg_player_year_rolling3: value(r, 4),
                shots_form_diff: value(r, 0) - value(opp, 0),
                sog_form_diff: value(r, 1) - value(opp, 1),
                assists_form_diff: value(r, 2) - value(opp, 2),
                player_count_form_diff: value(r, 3) - value(opp, 3),
                avg_player_year_form_diff: value(r, 4) - value(opp, 4),
                win_rate_diff: win_rate - opp.win_rate.unwrap_or(0.0),
                win_rate_rolling5: win_rate,
                player_count: row.player_count,
                fwd: row.fwd,
                mid: row.mid,
            });
        }
    }
    out
}

pub fn latest_form_by_team(rows: &[FormRow]) -> BTreeMap<String, FormRow> {
    let mut out: BTreeMap<String, FormRow> = BTreeMap::new();
    for row in rows {
        let newer = out.get(&row.team).is_none_or(|cur| {
            (date_sort_key(&row.date), &row.match_id) > (date_sort_key(&cur.date), &cur.match_id)
        });
        if newer {
            out.insert(row.team.clone(), row.clone());
        }
    }
    out
}
