use anyhow::{Result, anyhow};

use canwest_soccer::config::{Settings, load_dotenv};
use canwest_soccer::logging;
use canwest_soccer::model::ModelKind;
use canwest_soccer::records::Outcome;
use canwest_soccer::training::{TrainedModel, load_samples, train_classifier};

fn main() -> Result<()> {
    load_dotenv();
    logging::init_stderr();
    let settings = Settings::from_env();
    let paths = settings.paths();
    let force = has_flag("--force");
    let kinds = parse_model_arg()?;

    let mut refused = Vec::new();
    for kind in kinds {
        let samples = load_samples(kind, &paths)?;
        let trained = train_classifier(kind, samples, &settings.training)?;
        print_report(kind, &trained);

        let out_path = match kind {
            ModelKind::Predictive => &paths.predictive_model,
            ModelKind::Analytic => &paths.analytic_model,
        };
        if !trained.beats_baseline() && !force {
            println!("{kind}: validation log-loss did not beat the baseline; artifact not written");
            refused.push(kind);
            continue;
        }
        trained.classifier.save(out_path)?;
        println!("artifact written: {}", out_path.display());
        println!();
    }

    if !refused.is_empty() {
        return Err(anyhow!(
            "{} model(s) did not improve (pass --force to still write artifact)",
            refused.len()
        ));
    }
    Ok(())
}

fn print_report(kind: ModelKind, trained: &TrainedModel) {
    let m = trained.metrics();
    println!("== {kind} model ==");
    println!(
        "samples train={} val={} iterations={}",
        m.train_samples, m.val_samples, m.iterations
    );
    println!("train log_loss fit={:.6}", m.train_log_loss);
    if m.val_samples > 0 {
        println!(
            "val   log_loss baseline={:.6} fit={:.6} delta={:+.6}",
            m.baseline_val_log_loss,
            m.val_log_loss,
            m.baseline_val_log_loss - m.val_log_loss
        );
        println!("val   accuracy={:.3} brier={:.4}", m.val_accuracy, m.val_brier);
        println!("confusion (rows true, cols predicted):");
        println!("  {:>6}{:>6}{:>6}{:>6}", "", "Win", "Draw", "Loss");
        for (i, row) in m.confusion.iter().enumerate() {
            println!(
                "  {:>6}{:>6}{:>6}{:>6}",
                Outcome::CLASSES[i].label(),
                row[0],
                row[1],
                row[2]
            );
        }
    } else {
        println!("no held-out matches; validation metrics skipped");
    }

    let art = trained.classifier.artifact();
    println!("Win-class coefficients (standardized):");
    for (idx, name) in art.feature_names.iter().enumerate() {
        println!(
            "  {:28} coeff={:+.4} mean={:+.4} std={:.4}",
            name, art.coeffs[0][idx], art.feature_means[idx], art.feature_stds[idx]
        );
    }
}

fn parse_model_arg() -> Result<Vec<ModelKind>> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut raw = None;
    for (idx, arg) in args.iter().enumerate() {
        if let Some(v) = arg.strip_prefix("--model=") {
            raw = Some(v.to_string());
        }
        if arg == "--model"
            && let Some(next) = args.get(idx + 1)
        {
            raw = Some(next.clone());
        }
    }
    match raw.as_deref().map(str::trim) {
        None | Some("both") | Some("") => Ok(ModelKind::ALL.to_vec()),
        Some(v) => Ok(vec![v.parse::<ModelKind>()?]),
    }
}

fn has_flag(flag: &str) -> bool {
    std::env::args().skip(1).any(|a| a == flag)
}
