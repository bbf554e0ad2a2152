use blackjack_sim::prelude::*;
use blackjack_sim::{load_rules, write};
use clap::{Parser, ValueEnum};
use log::{error, info, warn};
use std::error::Error;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyKind {
    Random,
    Basic,
    Chart,
    HardSoftChart,
    HiLo,
    QLearning,
}

#[derive(Parser, Debug)]
#[command(
    name = "blackjack_sim",
    about = "Play blackjack strategies against the house and compare how they fare"
)]
struct Args {
    /// Strategy to simulate, repeat to compare several side by side
    #[arg(short, long = "strategy", value_enum, default_values_t = vec![StrategyKind::Basic, StrategyKind::HiLo])]
    strategies: Vec<StrategyKind>,

    /// Maximum number of hands per strategy
    #[arg(long, default_value_t = 1000)]
    hands: u32,

    /// Base betting unit
    #[arg(long, default_value_t = 5)]
    bet: u32,

    /// Starting bankroll
    #[arg(long, default_value_t = 1000.0)]
    bankroll: f64,

    /// Seed for reproducible shoes
    #[arg(long)]
    seed: Option<u64>,

    /// JSON file with house rules, missing fields take their defaults
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Trained model for the q-learning strategy, which then plays without exploring
    #[arg(long)]
    model: Option<PathBuf>,

    /// Print the summaries as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Log every settled round
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn build_strategy(kind: StrategyKind, args: &Args) -> Box<dyn Strategy + Send> {
    match kind {
        StrategyKind::Random => match args.seed {
            Some(seed) => Box::new(RandomStrategy::seeded(seed)),
            None => Box::new(RandomStrategy::new()),
        },
        StrategyKind::Basic => Box::new(FixedStrategy::new(BasicHitStand)),
        StrategyKind::Chart => Box::new(FixedStrategy::new(BasicChart)),
        StrategyKind::HardSoftChart => Box::new(FixedStrategy::new(HardSoftChart)),
        StrategyKind::HiLo => Box::new(HiLoStrategy::hi_lo()),
        StrategyKind::QLearning => {
            let mut strategy = QLearningStrategy::new();
            if let Some(seed) = args.seed {
                strategy = strategy.with_seed(seed);
            }
            if let Some(path) = &args.model {
                match strategy.load_model(path) {
                    Ok(entries) => info!("loaded {} entries from {}", entries, path.display()),
                    Err(e) => warn!("playing q-learning untrained: {}", e),
                }
                strategy.set_training_mode(false);
            }
            Box::new(strategy)
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let rules = match &args.rules {
        Some(path) => load_rules(path)?,
        None => HouseRules::default(),
    };
    let mut config_builder = BlackjackSimulatorConfig::new();
    config_builder
        .rules(rules)
        .num_hands(args.hands)
        .base_bet(args.bet)
        .starting_bankroll(args.bankroll);
    if let Some(seed) = args.seed {
        config_builder.seed(seed);
    }

    let mut builder = MulStrategyBlackjackSimulator::new(config_builder.build());
    for kind in args.strategies.iter() {
        builder.boxed_simulation(build_strategy(*kind, &args));
    }
    let mut simulator = builder.build();

    let summaries = if args.json {
        let summaries = simulator.run()?;
        println!("{}", write::summaries_to_json(&summaries)?);
        summaries
    } else {
        simulator.run_to_writer(std::io::stdout())?
    };
    info!("simulated {} strategies", summaries.len());
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
