use blackjack_sim::load_rules;
use blackjack_sim::prelude::*;
use blackjack_sim::training::{DEFAULT_EPSILON_SCHEDULE, DEFAULT_TRAINING_EPSILON};
use clap::Parser;
use log::{error, info, warn};
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "train", about = "Train the q-learning strategy and save its policy")]
struct Args {
    /// Number of rounds to train for
    #[arg(long, default_value_t = 100_000)]
    episodes: u64,

    /// Where the trained model is written
    #[arg(long, default_value = "models/q_learning.json")]
    output: PathBuf,

    /// Continue training from an existing model
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Base betting unit
    #[arg(long, default_value_t = 5)]
    bet: u32,

    /// Bankroll, restored whenever the learner goes broke
    #[arg(long, default_value_t = 10_000.0)]
    bankroll: f64,

    /// JSON file with house rules, missing fields take their defaults
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Seed for reproducible training
    #[arg(long)]
    seed: Option<u64>,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let rules = match &args.rules {
        Some(path) => load_rules(path)?,
        None => HouseRules::default(),
    };
    let mut config_builder = BlackjackSimulatorConfig::new();
    config_builder
        .rules(rules)
        .base_bet(args.bet)
        .starting_bankroll(args.bankroll);
    if let Some(seed) = args.seed {
        config_builder.seed(seed);
    }
    let config = config_builder.build();

    let mut strategy = QLearningStrategy::new();
    if let Some(seed) = args.seed {
        strategy = strategy.with_seed(seed);
    }
    if let Some(path) = &args.resume {
        if let Err(e) = strategy.load_model(path) {
            warn!("starting from scratch: {}", e);
        }
    }
    strategy.set_epsilon(DEFAULT_TRAINING_EPSILON);

    let (strategy, report) =
        train_learning_strategy(&config, strategy, args.episodes, &DEFAULT_EPSILON_SCHEDULE)?;
    strategy.save_model(&args.output)?;
    info!(
        "saved {} entries to {} (win rate {:.4} over {} episodes)",
        report.states_learned,
        args.output.display(),
        report.win_rate(),
        report.episodes
    );
    Ok(())
}

fn main() {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}
