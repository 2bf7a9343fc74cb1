use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::normalize::{PositionGroup, match_key, normalize_text, player_key, team_key};
use crate::table::{RawTable, RowView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    /// Class order used by every model artifact.
    pub const CLASSES: [Outcome; 3] = [Outcome::Win, Outcome::Draw, Outcome::Loss];

    pub fn from_goals(goals_for: u32, goals_against: u32) -> Self {
        if goals_for > goals_against {
            Outcome::Win
        } else if goals_for < goals_against {
            Outcome::Loss
        } else {
            Outcome::Draw
        }
    }

    pub fn index(self) -> usize {
        match self {
            Outcome::Win => 0,
            Outcome::Draw => 1,
            Outcome::Loss => 2,
        }
    }

    pub fn result_points(self) -> f64 {
        match self {
            Outcome::Win => 1.0,
            Outcome::Draw => 0.5,
            Outcome::Loss => 0.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Win => "Win",
            Outcome::Draw => "Draw",
            Outcome::Loss => "Loss",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub match_id: String,
    pub season: String,
    pub date: String,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
}

impl MatchRecord {
    pub fn from_row(row: RowView<'_>) -> Option<Self> {
        let match_id = match_key(row.text("match_id")?);
        let home_team = team_key(row.text("home_team")?);
        let away_team = team_key(row.text("away_team")?);
        if match_id.is_empty() || home_team.is_empty() || away_team.is_empty() {
            return None;
        }
        Some(Self {
            match_id,
            season: normalize_text(row.text("season").unwrap_or_default()),
            date: row.text("date").unwrap_or_default().to_string(),
            home_team,
            away_team,
            home_goals: row.maybe_number("home_goals").map(goal_count),
            away_goals: row.maybe_number("away_goals").map(goal_count),
        })
    }

    pub fn from_table(table: &RawTable) -> Vec<Self> {
        table.rows().filter_map(Self::from_row).collect()
    }

    pub fn is_home(&self, team: &str) -> Option<bool> {
        if team == self.home_team {
            Some(true)
        } else if team == self.away_team {
            Some(false)
        } else {
            None
        }
    }

    pub fn home_outcome(&self) -> Option<Outcome> {
        Some(Outcome::from_goals(self.home_goals?, self.away_goals?))
    }

    pub fn outcome_for(&self, is_home: bool) -> Option<Outcome> {
        let (h, a) = (self.home_goals?, self.away_goals?);
        Some(if is_home {
            Outcome::from_goals(h, a)
        } else {
            Outcome::from_goals(a, h)
        })
    }
}

pub fn parse_match_date(raw: &str) -> Option<NaiveDate> {
    const FORMATS: [&str; 5] = ["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y", "%Y%m%d"];
    let parse = |s: &str| {
        FORMATS
            .iter()
            .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
    };
    let s = raw.trim();
    parse(s).or_else(|| {
        s.split(['T', ' '])
            .next()
            .filter(|head| head.contains('-') || head.contains('/'))
            .and_then(parse)
    })
}

pub fn date_sort_key(raw: &str) -> (Option<NaiveDate>, String) {
    (parse_match_date(raw), raw.trim().to_string())
}

fn goal_count(v: f64) -> u32 {
    v.max(0.0).round() as u32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxscoreRow {
    pub match_id: String,
    pub team: String,
    pub player: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub position: String,
    #[serde(rename = "g", default)]
    pub goals: f64,
    #[serde(rename = "sh", default)]
    pub shots: f64,
    #[serde(rename = "sog", default)]
    pub sog: f64,
    #[serde(rename = "a", default)]
    pub assists: f64,
}

impl BoxscoreRow {
    pub fn from_row(row: RowView<'_>) -> Option<Self> {
        let match_id = match_key(row.text("match_id")?);
        let team = team_key(row.text("team")?);
        let player = player_key(row.text("player")?);
        if match_id.is_empty() || team.is_empty() || player.is_empty() {
            return None;
        }
        Some(Self {
            match_id,
            team,
            player,
            number: row.text("number").unwrap_or_default().to_string(),
            position: row.text_any(&["position", "pos"]).unwrap_or_default().to_string(),
            goals: row.number_any(&["g", "goals"]),
            shots: row.number_any(&["sh", "shots"]),
            sog: row.number_any(&["sog", "shots_on_goal"]),
            assists: row.number_any(&["a", "assists"]),
        })
    }

    pub fn key(&self) -> (&str, &str, &str) {
        (&self.match_id, &self.player, &self.team)
    }

    pub fn stats(&self) -> PlayerStats {
        PlayerStats {
            goals: self.goals,
            shots: self.shots,
            sog: self.sog,
            assists: self.assists,
        }
    }

    pub fn set_stats(&mut self, stats: PlayerStats) {
        self.goals = stats.goals;
        self.shots = stats.shots;
        self.sog = stats.sog;
        self.assists = stats.assists;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerStats {
    pub goals: f64,
    pub shots: f64,
    pub sog: f64,
    pub assists: f64,
}

impl PlayerStats {
    pub const NAMES: [&'static str; 4] = ["G", "SH", "SOG", "A"];

    pub fn as_array(self) -> [f64; 4] {
        [self.goals, self.shots, self.sog, self.assists]
    }

    pub fn mean_of<'a, I>(rows: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a PlayerStats>,
    {
        let mut sum = PlayerStats::default();
        let mut n = 0usize;
        for s in rows {
            sum.goals += s.goals;
            sum.shots += s.shots;
            sum.sog += s.sog;
            sum.assists += s.assists;
            n += 1;
        }
        if n == 0 {
            return None;
        }
        let n = n as f64;
        Some(PlayerStats {
            goals: sum.goals / n,
            shots: sum.shots / n,
            sog: sum.sog / n,
            assists: sum.assists / n,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupRow {
    pub season: String,
    pub team: String,
    pub player: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub gp: f64,
    #[serde(default)]
    pub gs: f64,
    #[serde(default)]
    pub goals: f64,
    #[serde(default)]
    pub assists: f64,
    #[serde(default)]
    pub points: f64,
    #[serde(default)]
    pub year_num: u8,
    #[serde(default)]
    pub year_std: String,
    #[serde(default)]
    pub position_zone: String,
    #[serde(default = "unknown_group")]
    pub position_group: PositionGroup,
}

fn unknown_group() -> PositionGroup {
    PositionGroup::Unk
}

impl LineupRow {
    pub fn from_row(row: RowView<'_>) -> Option<Self> {
        let team = row.text("team")?.to_string();
        let player = row.text("player")?.to_string();
        Some(Self {
            season: row.text("season").unwrap_or_default().to_string(),
            team,
            player,
            number: row.text("number").unwrap_or_default().to_string(),
            year: row.text_any(&["year", "yr", "cl"]).unwrap_or_default().to_string(),
            position: row.text_any(&["position", "pos"]).unwrap_or_default().to_string(),
            gp: row.number("gp"),
            gs: row.number("gs"),
            goals: row.number_any(&["goals", "g"]),
            assists: row.number_any(&["assists", "a"]),
            points: row.number_any(&["points", "pts"]),
            year_num: 0,
            year_std: String::new(),
            position_zone: String::new(),
            position_group: PositionGroup::Unk,
        })
    }

    pub fn known_year(&self) -> Option<f64> {
        (self.year_num > 0).then_some(self.year_num as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_is_perspective_relative() {
        let m = MatchRecord {
            match_id: "m".into(),
            season: "2023".into(),
            date: "2023-09-01".into(),
            home_team: "ubc".into(),
            away_team: "twu".into(),
            home_goals: Some(2),
            away_goals: Some(1),
        };
        assert_eq!(m.outcome_for(true), Some(Outcome::Win));
        assert_eq!(m.outcome_for(false), Some(Outcome::Loss));
        assert_eq!(m.is_home("twu"), Some(false));
        assert_eq!(m.is_home("unbc"), None);
    }

    #[test]
    fn boxscore_rows_without_keys_are_dropped() {
        let t = RawTable::from_reader(
            "match_id,team,player,G,SH,SOG,A\nm1,UBC,Ann Lee,1,3,2,0\nm1,,Bo,0,1,0,0\n".as_bytes(),
        )
        .unwrap();
        let rows: Vec<_> = t.rows().filter_map(BoxscoreRow::from_row).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].player, "ann lee");
        assert_eq!(rows[0].shots, 3.0);
    }

    #[test]
    fn dates_parse_in_common_layouts() {
        let d = NaiveDate::from_ymd_opt(2023, 9, 1).unwrap();
        assert_eq!(parse_match_date("2023-09-01"), Some(d));
        assert_eq!(parse_match_date("2023-09-01T19:00:00"), Some(d));
        assert_eq!(parse_match_date("9/1/2023"), Some(d));
        assert_eq!(parse_match_date("September 1, 2023"), Some(d));
        assert_eq!(parse_match_date("TBA"), None);
    }

    #[test]
    fn time_suffix_is_ignored_in_either_layout() {
        let d = NaiveDate::from_ymd_opt(2023, 9, 1).unwrap();
        assert_eq!(parse_match_date("9/1/2023 19:00"), Some(d));
        assert_eq!(parse_match_date("2023-09-01 7:00 PM"), Some(d));
        assert_eq!(parse_match_date("September 1, 2023"), Some(d));
    }

    #[test]
    fn match_season_uses_roster_text_normalization() {
        let t = RawTable::from_reader(
            "match_id,season,home_team,away_team\nm1,  2023   Season ,UBC,TWU\n".as_bytes(),
        )
        .unwrap();
        let m = MatchRecord::from_table(&t);
        assert_eq!(m[0].season, normalize_text(" 2023   Season "));
        assert_eq!(m[0].season, "2023 season");
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert!(PlayerStats::mean_of(std::iter::empty()).is_none());
    }
}
