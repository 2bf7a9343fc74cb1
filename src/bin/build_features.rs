use anyhow::Result;

use canwest_soccer::config::{Settings, load_dotenv};
use canwest_soccer::logging;
use canwest_soccer::pipeline;

fn main() -> Result<()> {
    load_dotenv();
    logging::init_stderr();
    let mut settings = Settings::from_env();
    if has_flag("--no-realign") {
        settings.boxscore_realign = false;
    }

    let summary = pipeline::run(&settings)?;
    let paths = settings.paths();
    println!("matches            {:>7}", summary.matches);
    println!("boxscore rows      {:>7}", summary.boxscore_rows);
    println!("roster rows        {:>7}", summary.lineup_rows);
    println!(
        "enriched rows      {:>7}  -> {}",
        summary.enriched_rows,
        paths.features_enriched.display()
    );
    println!(
        "opponent rows      {:>7}  -> {}",
        summary.opponent_rows,
        paths.features_opponent.display()
    );
    println!(
        "pre-match rows     {:>7}  -> {}",
        summary.prematch_rows,
        paths.features_prematch.display()
    );
    Ok(())
}

fn has_flag(flag: &str) -> bool {
    std::env::args().skip(1).any(|a| a == flag)
}
