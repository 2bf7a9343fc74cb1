use anyhow::{Context, Result, anyhow};

use crate::clean::{
    clean_boxscores, clean_lineups, lineups_from_table, load_raw_boxscores, merge_season_lineups,
    season_lineup_files,
};
use crate::config::{DataPaths, Settings};
use crate::opponent::{OpponentRow, build_opponent_rows};
use crate::prematch::{FormRow, build_prematch_rows};
use crate::records::{BoxscoreRow, LineupRow, MatchRecord};
use crate::table::{RawTable, write_records};
use crate::team_stats::{TeamMatchRow, build_team_match_rows};

#[derive(Debug, Clone)]
pub struct FeatureTables {
    pub boxscores: Vec<BoxscoreRow>,
    pub lineups: Vec<LineupRow>,
    pub enriched: Vec<TeamMatchRow>,
    pub opponent: Vec<OpponentRow>,
    pub prematch: Vec<FormRow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub matches: usize,
    pub boxscore_rows: usize,
    pub lineup_rows: usize,
    pub enriched_rows: usize,
    pub opponent_rows: usize,
    pub prematch_rows: usize,
}

impl FeatureTables {
    pub fn build(
        matches: &[MatchRecord],
        raw_boxscores: Vec<BoxscoreRow>,
        raw_lineups: Vec<LineupRow>,
    ) -> Self {
        let boxscores = clean_boxscores(raw_boxscores);
        let lineups = clean_lineups(raw_lineups);
        let enriched = build_team_match_rows(matches, &boxscores, &lineups);
        let opponent = build_opponent_rows(&enriched);
        let prematch = build_prematch_rows(&enriched);
        Self {
            boxscores,
            lineups,
            enriched,
            opponent,
            prematch,
        }
    }

    pub fn summary(&self, matches: usize) -> BuildSummary {
        BuildSummary {
            matches,
            boxscore_rows: self.boxscores.len(),
            lineup_rows: self.lineups.len(),
            enriched_rows: self.enriched.len(),
            opponent_rows: self.opponent.len(),
            prematch_rows: self.prematch.len(),
        }
    }

    pub fn write(&self, paths: &DataPaths) -> Result<()> {
        write_records(&paths.boxscores_clean, &self.boxscores)?;
        write_records(&paths.lineups_clean, &self.lineups)?;
        write_records(&paths.features_enriched, &self.enriched)?;
        write_records(&paths.features_opponent, &self.opponent)?;
        write_records(&paths.features_prematch, &self.prematch)?;
        Ok(())
    }
}

pub fn load_matches(paths: &DataPaths) -> Result<Vec<MatchRecord>> {
    let table = RawTable::read_path(&paths.matches)?;
    let matches = MatchRecord::from_table(&table);
    if matches.is_empty() {
        return Err(anyhow!(
            "no usable match rows in {}",
            paths.matches.display()
        ));
    }
    Ok(matches)
}

pub fn load_lineups(paths: &DataPaths) -> Result<Vec<LineupRow>> {
    let files = season_lineup_files(&paths.lineups_per_season)?;
    let table = if files.is_empty() {
        if !paths.lineups_all.exists() {
            tracing::warn!(
                path = %paths.lineups_all.display(),
                "no roster files; year and position columns will be empty"
            );
            return Ok(Vec::new());
        }
        RawTable::read_path(&paths.lineups_all)?
    } else {
        let merged = merge_season_lineups(&files)?;
        merged
            .write_path(&paths.lineups_all)
            .with_context(|| format!("write merged rosters {}", paths.lineups_all.display()))?;
        tracing::info!(files = files.len(), rows = merged.len(), "season rosters merged");
        merged
    };
    Ok(lineups_from_table(&table))
}

pub fn run(settings: &Settings) -> Result<BuildSummary> {
    let paths = settings.paths();
    let matches = load_matches(&paths)?;
    let boxscores = load_raw_boxscores(&paths.boxscores_raw, settings.boxscore_realign)?;
    let lineups = load_lineups(&paths)?;
    tracing::info!(
        matches = matches.len(),
        boxscores = boxscores.len(),
        lineups = lineups.len(),
        realign = settings.boxscore_realign,
        "inputs loaded"
    );

    let tables = FeatureTables::build(&matches, boxscores, lineups);
    tables.write(&paths)?;
    let summary = tables.summary(matches.len());
    tracing::info!(?summary, "feature files written");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn run_writes_every_output() {
        let root = std::env::temp_dir().join("canwest_pipeline_run");
        let _ = fs::remove_dir_all(&root);
        let data = root.join("data");
        fs::create_dir_all(data.join("per_season")).unwrap();
        fs::write(
            data.join("matches_all.csv"),
            "match_id,season,date,home_team,away_team,home_goals,away_goals\n\
             m1,2023,2023-09-01,UBC,TWU,2,1\n\
             m2,2023,2023-09-08,TWU,UBC,0,0\n",
        )
        .unwrap();
        fs::write(
            data.join("match_boxscores_detailed.csv"),
            "match_id,team,player,G,PLAYER,SH,SOG\n\
             m1,UBC,Ann,0,3,2,1\n\
             m1,TWU,Bea,0,1,1,1\n\
             m2,UBC,Ann,0,2,1,0\n\
             m2,TWU,Bea,0,4,2,0\n",
        )
        .unwrap();
        fs::write(
            data.join("per_season").join("team_lineups_2023.csv"),
            "season,team,player,year,position\n2023,UBC,Ann,So.,F\n2023,TWU,Bea,Sr.,M\n",
        )
        .unwrap();

        let settings = Settings {
            data_dir: data.clone(),
            models_dir: root.join("models"),
            log_file: None,
            boxscore_realign: true,
            training: Default::default(),
        };
        let summary = run(&settings).unwrap();
        assert_eq!(summary.matches, 2);
        assert_eq!(summary.enriched_rows, 4);
        assert_eq!(summary.opponent_rows, 4);
        assert_eq!(summary.prematch_rows, 4);

        let paths = settings.paths();
        for p in [
            &paths.boxscores_clean,
            &paths.lineups_clean,
            &paths.lineups_all,
            &paths.features_enriched,
            &paths.features_opponent,
            &paths.features_prematch,
        ] {
            assert!(p.exists(), "missing {}", p.display());
        }
        let enriched: Vec<TeamMatchRow> = crate::table::read_records(&paths.features_enriched).unwrap();
        let ubc = enriched.iter().find(|r| r.match_id == "m1" && r.team == "ubc").unwrap();
        assert_eq!(ubc.goals, 1.0);
        assert_eq!(ubc.fwd, 1.0);
    }
}
