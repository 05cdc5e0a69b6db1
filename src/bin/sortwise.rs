use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use sortwise::{
    config::Config,
    logging,
    models::SortMode,
    organizer::{ApplyPlan, ApplyReport, FileMover, OrganizationPlan, PreviewTree},
    pipeline::{Orchestrator, PipelineEvent, PipelineRunner, PipelineState, RunOutcome},
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sortwise")]
#[command(about = "Sort a folder into subfolders by what its files are about")]
#[command(version)]
struct Cli {
    /// Directory to organize
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    /// How to group files
    #[arg(long, value_enum, default_value_t = SortMode::AiSemantic)]
    mode: SortMode,

    /// Dry run (preview only, don't move files)
    #[arg(long)]
    dry_run: bool,

    /// Skip confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Print the plan (and apply report) as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Configuration file (defaults to ~/.config/sortwise/settings.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Cosine distance under which clusters merge (overrides config)
    #[arg(long)]
    threshold: Option<f32>,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load().unwrap_or_default(),
    };
    if let Some(threshold) = cli.threshold {
        config.clustering.distance_threshold = threshold;
    }

    if !cli.json {
        println!("Organizing directory: {} ({})", cli.dir.display(), cli.mode);
    }

    let mover = Arc::new(FileMover::new(&cli.dir)?.with_dry_run(cli.dry_run));
    let orchestrator = Arc::new(Orchestrator::from_config(config));

    // Moving without a prompt can go straight through the runner
    let apply_in_run = cli.yes && !cli.dry_run;
    let mut runner = PipelineRunner::new(orchestrator);
    if apply_in_run {
        runner = runner.with_sink(mover.clone());
    }
    let mut handle = runner.spawn(&cli.dir, cli.mode);

    let token = handle.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling...");
            token.cancel();
        }
    });

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {prefix:>10} [{wide_bar:.cyan/blue}] {pos}/{len} ({msg})")
            .context("Invalid progress template")?
            .progress_chars("#>-"),
    );
    if cli.json {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    let mut warnings = 0;
    let mut outcome = None;
    while let Some(event) = handle.next_event().await {
        match event {
            PipelineEvent::StateChanged { to, .. } => {
                pb.set_prefix(to.to_string());
                pb.set_position(0);
                pb.set_length(0);
                pb.set_message("");
            }
            PipelineEvent::Progress(progress) => {
                pb.set_length(progress.total as u64);
                pb.set_position(progress.completed as u64);
                if let Some(message) = progress.message {
                    pb.set_message(message);
                }
            }
            PipelineEvent::Warning { path, message } => {
                warnings += 1;
                let line = match path {
                    Some(path) => format!("Warning: {}: {}", path.display(), message),
                    None => format!("Warning: {}", message),
                };
                pb.suspend(|| eprintln!("{}", line));
            }
            PipelineEvent::Finished(o) => outcome = Some(o),
        }
    }
    pb.finish_and_clear();
    let outcome = match outcome {
        Some(outcome) => outcome,
        None => handle.wait().await,
    };

    match outcome {
        RunOutcome::PlanReady(plan) => finish_plan(&cli, plan, mover.as_ref(), warnings).await,
        RunOutcome::Applied { plan, report } => {
            report_applied(&cli, &plan, &report, warnings)?;
            Ok(())
        }
        RunOutcome::Cancelled => {
            println!("Cancelled. No files were moved.");
            Ok(())
        }
        RunOutcome::Failed { reason, message } => {
            anyhow::bail!("{} ({})", message, reason)
        }
    }
}

/// Preview, confirm and apply a plan the runner left for us
async fn finish_plan(cli: &Cli, plan: OrganizationPlan, mover: &FileMover, warnings: usize) -> Result<()> {
    if plan.is_empty() {
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            println!("\n✓ Nothing to organize.");
        }
        return Ok(());
    }

    if cli.json && (cli.dry_run || !cli.yes) {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        if !cli.dry_run {
            eprintln!("Use --yes to apply the plan together with --json.");
        }
        return Ok(());
    }

    println!("\n{}", PreviewTree::from_plan(&plan));
    print_summary(&plan, warnings);

    if cli.dry_run {
        println!("\nDry run completed. No files were moved.");
        return Ok(());
    }

    if !cli.yes {
        let proceed = Confirm::new()
            .with_prompt("Proceed with organization?")
            .default(false)
            .interact()?;

        if !proceed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let report = mover.apply(&plan).await?;
    report_applied(cli, &plan, &report, warnings)
}

fn report_applied(cli: &Cli, plan: &OrganizationPlan, report: &ApplyReport, warnings: usize) -> Result<()> {
    if cli.json {
        let body = serde_json::json!({
            "state": PipelineState::Done,
            "plan": plan,
            "report": report,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    // Applied inside the run: no preview was shown
    if cli.yes {
        print_summary(plan, warnings);
    }
    println!(
        "\nFiles organized: {} moved, {} skipped, {} failed",
        report.moved.len(),
        report.skipped.len(),
        report.failed.len()
    );
    for failed in &report.failed {
        eprintln!("  ⚠️  {}: {}", failed.source.display(), failed.reason);
    }
    Ok(())
}

fn print_summary(plan: &OrganizationPlan, warnings: usize) {
    let stats = plan.stats();
    println!(
        "\n📊 {} files, {} clusters ({} named by the model), {} in fallback folders, {} failed, {} ms",
        stats.files, stats.clusters, stats.generated_labels, stats.fallback, stats.failed, stats.elapsed_ms
    );
    if warnings > 0 {
        println!("   {} warning(s) during the run", warnings);
    }
}
