pub mod game;
pub mod model;
pub mod stats;
pub mod training;
pub mod write;

use blackjack_lib::{BlackjackGameError, HouseRules};
use game::events::Outcome;
use game::strategy::Strategy;
use game::BlackjackGame;
use log::info;
use model::ModelError;
use serde::{Deserialize, Serialize};
use stats::SimulationStatistics;
use std::cell::{Ref, RefCell};
use std::fmt::Display;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;
use std::sync::mpsc;
use std::thread;
use thiserror::Error;

pub mod prelude {
    pub use crate::game::prelude::*;
    pub use crate::model::{ModelError, PolicyModel};
    pub use crate::stats::SimulationStatistics;
    pub use crate::training::{train_learning_strategy, TrainingReport};
    pub use crate::{
        BlackjackSimulator, BlackjackSimulatorConfig, BlackjackSimulatorConfigBuilder,
        MulStrategyBlackjackSimulator, MulStrategyBlackjackSimulatorBuilder, SimulationError,
        SimulationSummary,
    };
}

/// Simple struct for recording all of the interesting data points accumulated during a simulation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub label: String,
    pub total_hands: u32,
    pub wins: u32,
    pub losses: u32,
    pub pushes: u32,
    pub doubles: u32,
    pub blackjacks: u32,
    pub surrenders: u32,
    pub win_rate: f64,
    pub starting_bankroll: f64,
    pub final_bankroll: f64,
    pub net_profit: f64,
    pub ended_early: bool,
    pub bankroll_history: Vec<f64>,
    pub cumulative_win_rates: Vec<f64>,
}

impl Display for SimulationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const WIDTH: usize = 80;
        const TEXT_WIDTH: usize = "number of player blackjacks".len() + 20;
        const NUM_WIDTH: usize = WIDTH - TEXT_WIDTH;
        let profit_per_hand = if self.total_hands == 0 {
            0.0
        } else {
            self.net_profit / self.total_hands as f64
        };
        let body = format!(
            "{}{}\n\
        {:<TEXT_WIDTH$}{:>NUM_WIDTH$}\n\
        {:<TEXT_WIDTH$}{:>NUM_WIDTH$}\n\
        {:<TEXT_WIDTH$}{:>NUM_WIDTH$}\n\
        {:<TEXT_WIDTH$}{:>NUM_WIDTH$}\n\
        {:<TEXT_WIDTH$}{:>NUM_WIDTH$}\n\
        {:<TEXT_WIDTH$}{:>NUM_WIDTH$}\n\
        {:<TEXT_WIDTH$}{:>NUM_WIDTH$}\n\
        {:<TEXT_WIDTH$}{:>NUM_WIDTH$.4}\n\
        {:<TEXT_WIDTH$}{:>NUM_WIDTH$.2}\n\
        {:<TEXT_WIDTH$}{:>NUM_WIDTH$.2}\n\
        {:<TEXT_WIDTH$}{:>NUM_WIDTH$.2}\n\
        {:<TEXT_WIDTH$}{:>NUM_WIDTH$.4}\n\
        {:<TEXT_WIDTH$}{:>NUM_WIDTH$}\n",
            "strategy: ",
            self.label,
            "hands won",
            self.wins,
            "hands pushed",
            self.pushes,
            "hands lost",
            self.losses,
            "number of player blackjacks",
            self.blackjacks,
            "number of doubles",
            self.doubles,
            "number of surrenders",
            self.surrenders,
            "total hands played",
            self.total_hands,
            "win rate",
            self.win_rate,
            "starting bankroll",
            self.starting_bankroll,
            "final bankroll",
            self.final_bankroll,
            "net profit",
            self.net_profit,
            "average profit per hand",
            profit_per_hand,
            "ran out of money",
            if self.ended_early { "yes" } else { "no" },
        );
        write!(f, "{}", body)
    }
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Game(#[from] BlackjackGameError),
    #[error("simulation thread panicked: {0}")]
    ThreadPanicked(String),
    #[error("failed to write results: {0}")]
    Write(#[from] io::Error),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Reads house rules from a JSON file, any field left out takes its default.
pub fn load_rules<P: AsRef<Path>>(path: P) -> Result<HouseRules, SimulationError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .map_err(|e| SimulationError::Config(format!("{}: {}", path.display(), e)))?;
    let rules: HouseRules = serde_json::from_str(&contents)
        .map_err(|e| SimulationError::Config(format!("{}: {}", path.display(), e)))?;
    rules.validate()?;
    Ok(rules)
}

/// Struct for running one strategy for a configured number of hands.
/// The run ends early if the bankroll can no longer cover a bet.
pub struct BlackjackSimulator<S: Strategy> {
    game: BlackjackGame<S>,
    stats: Rc<RefCell<SimulationStatistics>>,
    num_hands: u32,
}

impl<S: Strategy> BlackjackSimulator<S> {
    pub fn new(
        strategy: S,
        config: &BlackjackSimulatorConfig,
    ) -> Result<BlackjackSimulator<S>, SimulationError> {
        let mut game = BlackjackGame::new(config.rules.clone(), strategy, config.base_bet)?
            .with_bankroll(config.starting_bankroll);
        if let Some(seed) = config.seed {
            game = game.with_seed(seed);
        }
        let stats = Rc::new(RefCell::new(SimulationStatistics::new(
            config.starting_bankroll,
        )));
        game.add_observer(stats.clone());
        Ok(BlackjackSimulator {
            game,
            stats,
            num_hands: config.num_hands,
        })
    }

    /// Method that will run the simulation, recording the necessary data. Returns an error only if a round
    /// could not be played.
    pub fn run(&mut self) -> Result<(), SimulationError> {
        for hand in 0..self.num_hands {
            let result = self.game.play_round()?;
            if result.outcome == Outcome::Broke {
                info!(
                    "{} ran out of money after {} hands",
                    self.game.label(),
                    hand
                );
                break;
            }
        }
        Ok(())
    }

    /// Method to get a `SimulationSummary` object derived from the data recorded so far.
    pub fn summary(&self) -> SimulationSummary {
        self.stats.borrow().summary(&self.game.label())
    }

    pub fn statistics(&self) -> Ref<'_, SimulationStatistics> {
        self.stats.borrow()
    }

    pub fn game(&self) -> &BlackjackGame<S> {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut BlackjackGame<S> {
        &mut self.game
    }

    pub fn into_strategy(self) -> S {
        self.game.into_strategy()
    }
}

fn run_simulation(
    strategy: Box<dyn Strategy + Send>,
    config: &BlackjackSimulatorConfig,
) -> Result<SimulationSummary, SimulationError> {
    let mut simulator = BlackjackSimulator::new(strategy, config)?;
    info!(
        "running {} for up to {} hands",
        simulator.game().label(),
        config.num_hands
    );
    simulator.run()?;
    Ok(simulator.summary())
}

/// This struct is for testing multiple strategies at once. Each strategy is played on its own thread with
/// its own engine and shoe, so strategies never share cards or state.
pub struct MulStrategyBlackjackSimulator {
    strategies: Vec<Box<dyn Strategy + Send>>,
    pub config: BlackjackSimulatorConfig,
}

impl MulStrategyBlackjackSimulator {
    /// Method that returns a new `MulStrategyBlackjackSimulatorBuilder` object.
    pub fn new(config: BlackjackSimulatorConfig) -> MulStrategyBlackjackSimulatorBuilder {
        MulStrategyBlackjackSimulatorBuilder {
            strategies: None,
            config,
        }
    }

    pub fn add_simulation(&mut self, strategy: Box<dyn Strategy + Send>) {
        self.strategies.push(strategy);
    }

    pub fn num_simulations(&self) -> usize {
        self.strategies.len()
    }

    /// Runs every registered strategy and returns the summaries in the order the strategies were added.
    /// The strategies are consumed. With a configured seed, strategy `i` plays a shoe seeded with `seed + i`.
    pub fn run(&mut self) -> Result<Vec<SimulationSummary>, SimulationError> {
        let strategies = std::mem::take(&mut self.strategies);
        let count = strategies.len();
        let (sender, receiver) =
            mpsc::channel::<(usize, Result<SimulationSummary, SimulationError>)>();

        let mut handles = Vec::with_capacity(count);
        for (id, strategy) in strategies.into_iter().enumerate() {
            let sender = sender.clone();
            let mut config = self.config.clone();
            config.seed = config.seed.map(|seed| seed.wrapping_add(id as u64));
            handles.push(thread::spawn(move || {
                let result = run_simulation(strategy, &config);
                // the receiver is only dropped after every thread is joined
                let _ = sender.send((id, result));
            }));
        }
        drop(sender);

        let mut results: Vec<Option<Result<SimulationSummary, SimulationError>>> =
            (0..count).map(|_| None).collect();
        for (id, result) in receiver.iter() {
            results[id] = Some(result);
        }

        for (id, handle) in handles.into_iter().enumerate() {
            if handle.join().is_err() {
                return Err(SimulationError::ThreadPanicked(format!(
                    "simulation #{}",
                    id + 1
                )));
            }
        }

        results
            .into_iter()
            .enumerate()
            .map(|(id, result)| {
                result.unwrap_or_else(|| {
                    Err(SimulationError::ThreadPanicked(format!(
                        "simulation #{} sent no result",
                        id + 1
                    )))
                })
            })
            .collect()
    }

    /// Runs every strategy and writes the formatted summaries to `writer`.
    pub fn run_to_writer<W: Write>(
        &mut self,
        writer: W,
    ) -> Result<Vec<SimulationSummary>, SimulationError> {
        let summaries = self.run()?;
        write::write_summaries(&summaries, writer)?;
        Ok(summaries)
    }
}

/// Struct for building a `MulStrategyBlackjackSimulator` object
pub struct MulStrategyBlackjackSimulatorBuilder {
    strategies: Option<Vec<Box<dyn Strategy + Send>>>,
    config: BlackjackSimulatorConfig,
}

impl MulStrategyBlackjackSimulatorBuilder {
    /// Method for adding a new simulation, the only required input is a struct that implements the `Strategy` trait,
    /// the rest of the simulation is configured by the `BlackjackSimulatorConfig` passed during object creation.
    pub fn simulation<S: Strategy + Send + 'static>(&mut self, strategy: S) -> &mut Self {
        self.boxed_simulation(Box::new(strategy))
    }

    pub fn boxed_simulation(&mut self, strategy: Box<dyn Strategy + Send>) -> &mut Self {
        self.strategies.get_or_insert_with(Vec::new).push(strategy);
        self
    }

    /// Method that builds a `MulStrategyBlackjackSimulator` object
    pub fn build(&mut self) -> MulStrategyBlackjackSimulator {
        MulStrategyBlackjackSimulator {
            strategies: self.strategies.take().unwrap_or_default(),
            config: self.config.clone(),
        }
    }
}

/// Struct for configuring a simulation. Deserializes from JSON with every field optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackjackSimulatorConfig {
    pub rules: HouseRules,
    pub num_hands: u32,
    pub base_bet: u32,
    pub starting_bankroll: f64,
    pub seed: Option<u64>,
}

impl BlackjackSimulatorConfig {
    /// Associated method for returning a new `BlackjackSimulatorConfigBuilder` object, any option left unset
    /// takes the default value.
    pub fn new() -> BlackjackSimulatorConfigBuilder {
        BlackjackSimulatorConfigBuilder::default()
    }
}

impl Default for BlackjackSimulatorConfig {
    /// Returns the standard configurations for a simulation.
    fn default() -> Self {
        BlackjackSimulatorConfig::new().build()
    }
}

/// Struct to implement builder pattern for `BlackjackSimulatorConfig`
#[derive(Debug, Clone, Default)]
pub struct BlackjackSimulatorConfigBuilder {
    rules: Option<HouseRules>,
    num_hands: Option<u32>,
    base_bet: Option<u32>,
    starting_bankroll: Option<f64>,
    seed: Option<u64>,
}

impl BlackjackSimulatorConfigBuilder {
    /// Method for setting the house rules the strategies play under.
    pub fn rules(&mut self, rules: HouseRules) -> &mut Self {
        self.rules = Some(rules);
        self
    }

    /// Method for setting the maximum number of hands played per strategy
    pub fn num_hands(&mut self, hands: u32) -> &mut Self {
        self.num_hands = Some(hands);
        self
    }

    /// Method for setting the base betting unit
    pub fn base_bet(&mut self, bet: u32) -> &mut Self {
        self.base_bet = Some(bet);
        self
    }

    /// Method for changing the starting bankroll of the player.
    pub fn starting_bankroll(&mut self, bankroll: f64) -> &mut Self {
        self.starting_bankroll = Some(bankroll);
        self
    }

    /// Method for making the shoes reproducible.
    pub fn seed(&mut self, seed: u64) -> &mut Self {
        self.seed = Some(seed);
        self
    }

    /// Method for building a `BlackjackSimulatorConfig` object from the given builder.
    pub fn build(&mut self) -> BlackjackSimulatorConfig {
        BlackjackSimulatorConfig {
            rules: self.rules.clone().unwrap_or_default(),
            num_hands: self.num_hands.unwrap_or(1000),
            base_bet: self.base_bet.unwrap_or(5),
            starting_bankroll: self.starting_bankroll.unwrap_or(game::DEFAULT_BANKROLL),
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game::strategy::{
        BasicChart, BasicHitStand, FixedStrategy, HardSoftChart, HiLoStrategy, QLearningStrategy,
        RandomStrategy,
    };

    fn seeded_config(hands: u32) -> BlackjackSimulatorConfig {
        BlackjackSimulatorConfig::new()
            .num_hands(hands)
            .base_bet(5)
            .starting_bankroll(1000.0)
            .seed(7)
            .build()
    }

    #[test]
    fn test_config_defaults() {
        let config = BlackjackSimulatorConfig::default();
        assert_eq!(config.num_hands, 1000);
        assert_eq!(config.base_bet, 5);
        assert_eq!(config.starting_bankroll, 1000.0);
        assert_eq!(config.seed, None);
        assert_eq!(config.rules, HouseRules::default());

        let from_json: BlackjackSimulatorConfig =
            serde_json::from_str(r#"{"num_hands": 50, "rules": {"num_decks": 2}}"#).unwrap();
        assert_eq!(from_json.num_hands, 50);
        assert_eq!(from_json.base_bet, 5);
        assert_eq!(from_json.rules.num_decks, 2);
        assert_eq!(from_json.rules.blackjack_payout, 1.5);
    }

    #[test]
    fn test_simple_simulation() {
        let mut simulator =
            BlackjackSimulator::new(FixedStrategy::new(BasicHitStand), &seeded_config(300)).unwrap();
        simulator.run().unwrap();
        let summary = simulator.summary();
        assert_eq!(summary.label, "Basic");
        assert_eq!(summary.total_hands, 300);
        assert_eq!(summary.wins + summary.losses + summary.pushes, 300);
        assert_eq!(summary.bankroll_history.len(), 300);
        assert_eq!(summary.final_bankroll, simulator.game().bankroll());
        assert_eq!(summary.net_profit, summary.final_bankroll - 1000.0);
        assert!(!summary.ended_early);
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let run = || {
            let mut simulator =
                BlackjackSimulator::new(HiLoStrategy::hi_lo(), &seeded_config(200)).unwrap();
            simulator.run().unwrap();
            simulator.summary()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_stops_when_broke() {
        let config = BlackjackSimulatorConfig::new()
            .num_hands(100_000)
            .base_bet(10)
            .starting_bankroll(30.0)
            .seed(11)
            .build();
        let mut simulator = BlackjackSimulator::new(RandomStrategy::seeded(4), &config).unwrap();
        simulator.run().unwrap();
        let stats = simulator.statistics();
        assert!(stats.ended_early);
        assert!(stats.total_hands() < 100_000);
        assert!(stats.final_bankroll() < 10.0);
    }

    #[test]
    fn test_invalid_config() {
        let config = BlackjackSimulatorConfig::new().base_bet(0).build();
        assert!(matches!(
            BlackjackSimulator::new(FixedStrategy::new(BasicChart), &config),
            Err(SimulationError::Game(BlackjackGameError::InvalidBet(0)))
        ));
    }

    #[test]
    fn test_run_multiple_simulations() {
        let mut simulator = MulStrategyBlackjackSimulator::new(seeded_config(250))
            .simulation(FixedStrategy::new(BasicHitStand))
            .simulation(FixedStrategy::new(HardSoftChart))
            .simulation(HiLoStrategy::hi_lo())
            .simulation(QLearningStrategy::new().with_seed(1))
            .build();
        assert_eq!(simulator.num_simulations(), 4);

        let mut out: Vec<u8> = Vec::new();
        let summaries = simulator.run_to_writer(&mut out).unwrap();
        assert_eq!(summaries.len(), 4);
        assert_eq!(summaries[0].label, "Basic");
        assert_eq!(summaries[1].label, "Hard/Soft Chart");
        assert!(summaries[2].label.starts_with("HiLo"));
        assert!(summaries[3].label.starts_with("Q-Learning"));
        for summary in summaries.iter() {
            assert!(summary.total_hands > 0);
        }

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("simulation #4"));
        assert_eq!(simulator.num_simulations(), 0);
    }

    #[test]
    fn test_threads_match_single_runs() {
        let config = seeded_config(150);
        let mut simulator = MulStrategyBlackjackSimulator::new(config.clone())
            .simulation(FixedStrategy::new(BasicHitStand))
            .simulation(FixedStrategy::new(BasicHitStand))
            .build();
        let summaries = simulator.run().unwrap();

        let mut second = config.clone();
        second.seed = Some(8);
        let mut single = BlackjackSimulator::new(FixedStrategy::new(BasicHitStand), &second).unwrap();
        single.run().unwrap();
        assert_eq!(summaries[1], single.summary());
    }

    #[test]
    fn test_load_rules() {
        let dir = std::env::temp_dir().join(format!("blackjack_sim_rules_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let good = dir.join("rules.json");
        fs::write(&good, r#"{"num_decks": 1, "dealer_hits_soft_17": true}"#).unwrap();
        let rules = load_rules(&good).unwrap();
        assert_eq!(rules.num_decks, 1);
        assert!(rules.dealer_hits_soft_17);

        let bad = dir.join("bad.json");
        fs::write(&bad, r#"{"num_decks": 0}"#).unwrap();
        assert!(matches!(
            load_rules(&bad),
            Err(SimulationError::Game(BlackjackGameError::InvalidRules(_)))
        ));
        assert!(matches!(
            load_rules(dir.join("missing.json")),
            Err(SimulationError::Config(_))
        ));
        let _ = fs::remove_dir_all(&dir);
    }
}
