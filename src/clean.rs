use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::normalize::{match_key, normalize_position, normalize_text, normalize_year, player_key, team_key};
use crate::records::{BoxscoreRow, LineupRow};
use crate::table::RawTable;

/// The boxscore scraper shifts stat headers by one column; this restores
/// their real meaning (`G` holds assists, `PLAYER` shots, and so on).
pub const BOXSCORE_REALIGN: [(&str, &str); 4] =
    [("G", "A"), ("PLAYER", "SH"), ("SH", "SOG"), ("SOG", "G")];

pub fn load_raw_boxscores(path: &Path, realign: bool) -> Result<Vec<BoxscoreRow>> {
    let renames: &[(&str, &str)] = if realign { &BOXSCORE_REALIGN } else { &[] };
    let table = RawTable::read_path_renamed(path, renames)?;
    let total = table.len();
    let rows: Vec<BoxscoreRow> = table.rows().filter_map(BoxscoreRow::from_row).collect();
    if rows.len() < total {
        tracing::info!(
            dropped = total - rows.len(),
            "boxscore rows without match/team/player dropped"
        );
    }
    Ok(rows)
}

pub fn clean_boxscores(rows: Vec<BoxscoreRow>) -> Vec<BoxscoreRow> {
    let normalized = rows.into_iter().filter_map(|mut r| {
        r.match_id = match_key(&r.match_id);
        r.team = team_key(&r.team);
        r.player = player_key(&r.player);
        if r.match_id.is_empty() || r.team.is_empty() || r.player.is_empty() {
            return None;
        }
        Some(r)
    });
    dedupe_keep_last(normalized.collect(), |r| {
        (r.match_id.clone(), r.player.clone(), r.team.clone())
    })
}

pub fn clean_lineups(rows: Vec<LineupRow>) -> Vec<LineupRow> {
    let normalized = rows.into_iter().filter_map(|mut r| {
        r.season = normalize_text(&r.season);
        r.team = team_key(&r.team);
        r.player = player_key(&r.player);
        if r.team.is_empty() || r.player.is_empty() {
            return None;
        }
        let source_year = if r.year.trim().is_empty() { &r.year_std } else { &r.year };
        let (year_num, year_std) = normalize_year(source_year);
        r.year_num = year_num;
        r.year_std = year_std.to_string();
        let source_pos = if r.position.trim().is_empty() {
            r.position_zone.clone()
        } else {
            r.position.clone()
        };
        let (zone, group) = normalize_position(&source_pos);
        r.position_zone = zone;
        r.position_group = group;
        Some(r)
    });
    dedupe_keep_last(normalized.collect(), |r| {
        (r.season.clone(), r.team.clone(), r.player.clone())
    })
}

fn dedupe_keep_last<T, K, F>(rows: Vec<T>, key: F) -> Vec<T>
where
    K: std::hash::Hash + Eq,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::with_capacity(rows.len());
    let mut kept: Vec<T> = Vec::with_capacity(rows.len());
    for row in rows.into_iter().rev() {
        if seen.insert(key(&row)) {
            kept.push(row);
        }
    }
    kept.reverse();
    kept
}

pub fn season_lineup_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("team_lineups_") && n.ends_with(".csv"))
        })
        .collect();
    files.sort();
    Ok(files)
}

pub fn merge_season_lineups(files: &[PathBuf]) -> Result<RawTable> {
    let mut merged = RawTable::default();
    for path in files {
        let part = RawTable::read_path(path)?;
        tracing::debug!(file = %path.display(), rows = part.len(), "season roster loaded");
        merged.append(&part);
    }
    Ok(merged)
}

pub fn lineups_from_table(table: &RawTable) -> Vec<LineupRow> {
    table.rows().filter_map(LineupRow::from_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn box_row(match_id: &str, team: &str, player: &str, goals: f64) -> BoxscoreRow {
        BoxscoreRow {
            match_id: match_id.to_string(),
            team: team.to_string(),
            player: player.to_string(),
            number: String::new(),
            position: String::new(),
            goals,
            shots: 0.0,
            sog: 0.0,
            assists: 0.0,
        }
    }

    #[test]
    fn dedupe_keeps_last_occurrence() {
        let rows = vec![
            box_row("M1", "UBC", "Ann", 1.0),
            box_row("m1", "ubc", "ann ", 2.0),
            box_row("m1", "twu", "ann", 0.0),
        ];
        let out = clean_boxscores(rows);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].goals, 2.0);
        assert_eq!(out[0].team, "ubc");
    }

    #[test]
    fn realign_restores_stat_meaning() {
        let dir = std::env::temp_dir().join("canwest_clean_realign");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("box.csv");
        fs::write(
            &path,
            "match_id,team,player,G,PLAYER,SH,SOG\nm1,UBC,Ann,1,4,3,2\n",
        )
        .unwrap();
        let rows = load_raw_boxscores(&path, true).unwrap();
        assert_eq!(rows[0].assists, 1.0);
        assert_eq!(rows[0].shots, 4.0);
        assert_eq!(rows[0].sog, 3.0);
        assert_eq!(rows[0].goals, 2.0);
    }

    #[test]
    fn aligned_file_loads_unchanged_without_realign() {
        let dir = std::env::temp_dir().join("canwest_clean_aligned");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("box.csv");
        fs::write(
            &path,
            "match_id,team,player,G,SH,SOG,A\nm1,UBC,Ann,2,4,3,1\n",
        )
        .unwrap();
        let rows = load_raw_boxscores(&path, false).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].player, "ann");
        assert_eq!(rows[0].goals, 2.0);
        assert_eq!(rows[0].shots, 4.0);
        assert_eq!(rows[0].sog, 3.0);
        assert_eq!(rows[0].assists, 1.0);

        // the same file through the realign path is scrambled
        let realigned = load_raw_boxscores(&path, true).unwrap();
        assert_ne!(realigned[0].goals, 2.0);
    }

    #[test]
    fn lineup_cleaning_fills_year_and_group() {
        let raw = RawTable::from_reader(
            "season,team,player,year,position\n2023,UBC Okanagan,Ann Lee,Jr.,D\n2023,UBC Okanagan,Ann Lee,Sr.,D\n"
                .as_bytes(),
        )
        .unwrap();
        let out = clean_lineups(lineups_from_table(&raw));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].team, "ubc-okanagan");
        assert_eq!(out[0].year_num, 4);
        assert_eq!(out[0].position_group, crate::normalize::PositionGroup::Def);
    }

    #[test]
    fn roster_season_joins_match_season() {
        use crate::records::MatchRecord;
        use crate::team_stats::RosterIndex;

        let matches = RawTable::from_reader(
            "match_id,season,home_team,away_team\nm1,2023  Fall,UBC,TWU\n".as_bytes(),
        )
        .unwrap();
        let m = &MatchRecord::from_table(&matches)[0];
        let raw = RawTable::from_reader(
            "season,team,player,year,position\n2023 FALL,UBC,Ann Lee,Jr.,D\n2022,UBC,Ann Lee,So.,D\n"
                .as_bytes(),
        )
        .unwrap();
        let roster = RosterIndex::new(&clean_lineups(lineups_from_table(&raw)));
        let entry = roster.lookup(&m.season, "ubc", "ann lee").unwrap();
        assert_eq!(entry.year_num, 3);
    }
}
