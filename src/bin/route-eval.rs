use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use clap::Parser;
use routing_accuracy::{
    eval::load_cases, EvalCase, EvalRunner, EvaluatorConfig, RoutingAccuracyEvaluator,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "route-eval")]
#[command(about = "Score orchestrator routes against reference routes")]
struct Args {
    /// Path to cases directory or case file (JSON/JSONL/YAML)
    #[arg(long, default_value = "eval/cases")]
    cases: PathBuf,

    /// Evaluator config file (YAML/JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Step type to evaluate (repeatable, overrides the config)
    #[arg(long = "step-type")]
    step_types: Vec<String>,

    /// Output path for JSONL per-case results
    #[arg(long)]
    out: Option<PathBuf>,

    /// Output path for the flat per-agent aggregate (JSON)
    #[arg(long)]
    aggregate_out: Option<PathBuf>,

    /// Run only cases whose id contains this substring (repeatable)
    #[arg(long)]
    filter: Vec<String>,

    /// Fail when mean precision is below this value
    #[arg(long)]
    min_precision: Option<f64>,

    /// Fail when mean recall is below this value
    #[arg(long)]
    min_recall: Option<f64>,
}

fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn default_out_path() -> PathBuf {
    let ts = chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    PathBuf::from(format!("eval/runs/{ts}.jsonl"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EvaluatorConfig::from_path(path)?,
        None => EvaluatorConfig::default(),
    };
    if !args.step_types.is_empty() {
        config = config.with_step_types(args.step_types.clone());
    }
    let evaluator = RoutingAccuracyEvaluator::new(config)?;

    let cases = filter_cases(load_cases(&args.cases)?, &args.filter);
    if cases.is_empty() {
        eprintln!("No cases matched.");
        std::process::exit(2);
    }

    let report = EvalRunner::new(&evaluator).run(&cases);

    let out_path = args.out.unwrap_or_else(default_out_path);
    ensure_parent_dir(&out_path)?;
    let mut writer = BufWriter::new(fs::File::create(&out_path)?);
    for record in &report.cases {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    let flat = report.aggregate.flatten();
    if let Some(path) = &args.aggregate_out {
        ensure_parent_dir(path)?;
        fs::write(path, serde_json::to_string_pretty(&flat)?)?;
    }

    let summary = &report.summary;
    println!(
        "Cases: {}, ordered {:.2}, unordered {:.2}, unordered(dedup) {:.2}, superset {:.2}, subset {:.2}",
        summary.total,
        summary.ordered_match_rate,
        summary.unordered_match_rate,
        summary.unordered_match_dedup_rate,
        summary.superset_match_rate,
        summary.subset_match_rate,
    );
    println!(
        "Mean: precision {:.2}, recall {:.2}, precision(dedup) {:.2}, recall(dedup) {:.2}, Output: {}",
        summary.mean_precision,
        summary.mean_recall,
        summary.mean_precision_dedup,
        summary.mean_recall_dedup,
        out_path.display()
    );
    println!("Per-agent:");
    for (agent, metrics) in &report.aggregate.agents {
        println!(
            "  {agent}: precision={:.2}, recall={:.2}, support={}",
            metrics.precision, metrics.recall, metrics.support
        );
    }

    let mut failed = false;
    if let Some(min) = args.min_precision {
        if summary.mean_precision < min {
            eprintln!("FAIL mean precision {:.2} < {min:.2}", summary.mean_precision);
            failed = true;
        }
    }
    if let Some(min) = args.min_recall {
        if summary.mean_recall < min {
            eprintln!("FAIL mean recall {:.2} < {min:.2}", summary.mean_recall);
            failed = true;
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn filter_cases(mut cases: Vec<EvalCase>, filters: &[String]) -> Vec<EvalCase> {
    if filters.is_empty() {
        return cases;
    }
    cases.retain(|c| filters.iter().any(|f| c.id.contains(f)));
    cases
}
