// rl-lab: drive a remote reinforcement-learning training run from the terminal
//
// Connects to a training engine, streams one session to completion while
// logging the windowed-average reward chart, and optionally replays the
// learned policy.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use rl_lab_controller::{
    HttpEngine, LabOptions, ParameterValue, Phase, SessionController, Snapshot,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON options file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Engine base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Algorithm id
    #[arg(short, long)]
    algorithm: Option<String>,

    /// Environment id
    #[arg(short, long)]
    environment: Option<String>,

    /// Seed sent with the start request
    #[arg(long)]
    seed: Option<u64>,

    /// Parameter override, repeatable
    #[arg(short, long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    params: Vec<(String, ParameterValue)>,

    /// Fetch the engine's parameter schema and start from its defaults
    #[arg(long, default_value_t = false)]
    load_schema: bool,

    /// List available algorithms and environments, then exit
    #[arg(long, default_value_t = false)]
    list: bool,

    /// Replay the learned policy after training completes
    #[arg(long, default_value_t = false)]
    play: bool,
}

fn parse_param(raw: &str) -> std::result::Result<(String, ParameterValue), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in '{raw}'"));
    }
    Ok((name.to_string(), ParameterValue::parse(value.trim())))
}

fn load_options(args: &Args) -> Result<LabOptions> {
    let options = match args.config {
        Some(ref path) => LabOptions::from_json_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => LabOptions::default(),
    };
    let mut options = options.apply_env()?;

    if let Some(ref url) = args.base_url {
        options.base_url.clone_from(url);
    }
    if let Some(ref algorithm) = args.algorithm {
        options.algorithm.clone_from(algorithm);
    }
    if let Some(ref environment) = args.environment {
        options.environment.clone_from(environment);
    }
    if args.seed.is_some() {
        options.seed = args.seed;
    }

    options.validate()?;
    Ok(options)
}

fn print_chart(snapshot: &Snapshot) {
    println!(
        "{} on {}: {} episodes, window {}",
        snapshot.selection.algorithm,
        snapshot.selection.environment,
        snapshot.rewards_received,
        snapshot.window_size
    );
    for point in snapshot.chart.points() {
        println!("{:>8} {:>10.4}", point.episode, point.average);
    }
    if let Some(stats) = snapshot.stats {
        println!(
            "current average {:.4}, best average {:.4}",
            stats.current_average, stats.best_average
        );
    }
}

async fn train(controller: &mut SessionController<HttpEngine>) -> Result<()> {
    controller.start().await?;

    let mut reported = 0;
    while matches!(controller.phase(), Phase::Starting | Phase::Training) {
        tokio::select! {
            result = controller.pump() => result?,
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, stopping training");
                controller.stop().await?;
                return Ok(());
            }
        }

        let snapshot = controller.snapshot();
        if snapshot.chart.len() > reported {
            reported = snapshot.chart.len();
            if let Some(point) = snapshot.chart.last() {
                log::info!(
                    "episode {}/{}: average reward {:.4}",
                    point.episode,
                    snapshot.total_episodes,
                    point.average
                );
            }
        }
    }

    let snapshot = controller.snapshot();
    print_chart(&snapshot);
    if let Some(ref error) = snapshot.last_error {
        bail!("Training failed: {}", error.message);
    }
    Ok(())
}

async fn play(controller: &mut SessionController<HttpEngine>) -> Result<()> {
    controller.play_policy().await?;

    while controller.phase().is_playback() {
        controller.pump().await?;
        if let Some((index, count)) = controller.snapshot().playback_position {
            log::info!("frame {}/{count}", index + 1);
        }
    }

    if let Some(error) = controller.snapshot().last_error {
        bail!("Playback failed: {}", error.message);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let options = load_options(&args)?;
    let engine = HttpEngine::new(&options)?;
    let mut controller = SessionController::new(engine, options);

    if args.list {
        println!("algorithms:   {}", controller.algorithms().await?.join(", "));
        println!("environments: {}", controller.environments().await?.join(", "));
        return Ok(());
    }

    if args.load_schema {
        controller.load_parameter_schema().await?;
    }
    if !args.params.is_empty() {
        let mut parameters = controller.selection().parameters.clone();
        for (name, value) in args.params.iter().cloned() {
            parameters.insert(name, value);
        }
        controller.set_parameters(parameters).await?;
    }

    let outcome = async {
        train(&mut controller).await?;
        if args.play && controller.phase() == Phase::Completed {
            play(&mut controller).await?;
        }
        Ok::<_, anyhow::Error>(())
    }
    .await;

    controller.teardown().await;
    outcome
}
