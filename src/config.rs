use std::env;
use std::path::{Path, PathBuf};

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_MODELS_DIR: &str = "models";

#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub models_dir: PathBuf,
    pub log_file: Option<PathBuf>,
    pub boxscore_realign: bool,
    pub training: TrainingSettings,
}

#[derive(Debug, Clone, Copy)]
pub struct TrainingSettings {
    pub val_fraction: f64,
    pub l2: f64,
    pub max_iters: usize,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            val_fraction: 0.2,
            l2: 0.01,
            max_iters: 3000,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = TrainingSettings::default();
        Self {
            data_dir: env_path("CANWEST_DATA_DIR").unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            models_dir: env_path("CANWEST_MODELS_DIR")
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODELS_DIR)),
            log_file: env_path("CANWEST_LOG_FILE"),
            boxscore_realign: env_flag("CANWEST_BOXSCORE_REALIGN").unwrap_or(true),
            training: TrainingSettings {
                val_fraction: env_parse::<f64>("CANWEST_VAL_FRACTION")
                    .unwrap_or(defaults.val_fraction)
                    .clamp(0.0, 0.5),
                l2: env_parse::<f64>("CANWEST_L2").unwrap_or(defaults.l2).max(0.0),
                max_iters: env_parse::<usize>("CANWEST_MAX_ITERS")
                    .unwrap_or(defaults.max_iters)
                    .max(1),
            },
        }
    }

    pub fn paths(&self) -> DataPaths {
        DataPaths::new(&self.data_dir, &self.models_dir)
    }
}

#[derive(Debug, Clone)]
pub struct DataPaths {
    pub matches: PathBuf,
    pub boxscores_raw: PathBuf,
    pub boxscores_clean: PathBuf,
    pub lineups_per_season: PathBuf,
    pub lineups_all: PathBuf,
    pub lineups_clean: PathBuf,
    pub features_enriched: PathBuf,
    pub features_opponent: PathBuf,
    pub features_prematch: PathBuf,
    pub swap_scenarios: PathBuf,
    pub predictive_model: PathBuf,
    pub analytic_model: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: &Path, models_dir: &Path) -> Self {
        Self {
            matches: data_dir.join("matches_all.csv"),
            boxscores_raw: data_dir.join("match_boxscores_detailed.csv"),
            boxscores_clean: data_dir.join("match_boxscores_detailed_cleaned.csv"),
            lineups_per_season: data_dir.join("per_season"),
            lineups_all: data_dir.join("team_lineups_all.csv"),
            lineups_clean: data_dir.join("team_lineups_clean.csv"),
            features_enriched: data_dir.join("features_enriched.csv"),
            features_opponent: data_dir.join("features_opponent.csv"),
            features_prematch: data_dir.join("features_prematch_full.csv"),
            swap_scenarios: data_dir.join("swap_scenarios"),
            predictive_model: models_dir.join("predictive_model.json"),
            analytic_model: models_dir.join("analytic_model.json"),
        }
    }
}

pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|raw| raw.trim().parse::<T>().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    let raw = env::var(key).ok()?;
    Some(!matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "off" | "no"
    ))
}
