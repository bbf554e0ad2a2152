use crate::game::events::Outcome;
use crate::game::strategy::QLearningStrategy;
use crate::game::BlackjackGame;
use crate::{BlackjackSimulatorConfig, SimulationError};
use log::info;
use serde::Serialize;

/// Exploration rate a fresh training run starts with.
pub const DEFAULT_TRAINING_EPSILON: f64 = 0.3;

/// `(episode, epsilon)` pairs, exploration drops to `epsilon` once `episode` rounds have been played.
pub const DEFAULT_EPSILON_SCHEDULE: [(u64, f64); 2] = [(50_000, 0.15), (80_000, 0.05)];

const REPORT_EVERY: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub episodes: u64,
    pub wins: u64,
    pub losses: u64,
    pub pushes: u64,
    /// Times the bankroll ran out and was topped back up to the starting bankroll.
    pub restakes: u64,
    pub states_learned: usize,
}

impl TrainingReport {
    pub fn win_rate(&self) -> f64 {
        let decided = self.wins + self.losses;
        if decided == 0 {
            0.0
        } else {
            self.wins as f64 / decided as f64
        }
    }
}

/// Trains `strategy` for `episodes` rounds under `config`. A learner that goes broke is re-staked
/// with the starting bankroll so training never stops early. Returns the trained strategy.
pub fn train_learning_strategy(
    config: &BlackjackSimulatorConfig,
    mut strategy: QLearningStrategy,
    episodes: u64,
    schedule: &[(u64, f64)],
) -> Result<(QLearningStrategy, TrainingReport), SimulationError> {
    strategy.set_training_mode(true);
    let mut game = BlackjackGame::new(config.rules.clone(), strategy, config.base_bet)?
        .with_bankroll(config.starting_bankroll);
    if let Some(seed) = config.seed {
        game = game.with_seed(seed);
    }

    let mut report = TrainingReport {
        episodes: 0,
        wins: 0,
        losses: 0,
        pushes: 0,
        restakes: 0,
        states_learned: 0,
    };

    info!(
        "training for {} episodes, epsilon {}",
        episodes,
        game.strategy().epsilon()
    );
    for episode in 0..episodes {
        for (at, epsilon) in schedule.iter() {
            if *at == episode {
                game.strategy_mut().set_epsilon(*epsilon);
                info!("episode {}: epsilon now {}", episode, epsilon);
            }
        }

        let result = game.play_round()?;
        match result.outcome {
            Outcome::Win | Outcome::Blackjack => report.wins += 1,
            Outcome::Loss | Outcome::SurrLoss => report.losses += 1,
            Outcome::Push => report.pushes += 1,
            Outcome::Broke => {
                game.set_bankroll(config.starting_bankroll);
                report.restakes += 1;
            }
        }
        report.episodes += 1;

        if report.episodes % REPORT_EVERY == 0 {
            info!(
                "episode {}/{}: win rate {:.4}, bankroll {:.2}, {} states learned",
                report.episodes,
                episodes,
                report.win_rate(),
                game.bankroll(),
                game.strategy().num_entries()
            );
        }
    }

    let strategy = game.into_strategy();
    report.states_learned = strategy.num_entries();
    info!(
        "training finished: win rate {:.4}, {} states learned, {} restakes",
        report.win_rate(),
        report.states_learned,
        report.restakes
    );
    Ok((strategy, report))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_training_run() {
        let config = BlackjackSimulatorConfig::new().seed(5).build();
        let strategy = QLearningStrategy::with_hyperparameters(0.1, 0.95, DEFAULT_TRAINING_EPSILON)
            .with_seed(5);
        let (trained, report) =
            train_learning_strategy(&config, strategy, 3_000, &[(1_000, 0.15), (2_000, 0.05)])
                .unwrap();

        assert_eq!(report.episodes, 3_000);
        assert_eq!(
            report.wins + report.losses + report.pushes + report.restakes,
            3_000
        );
        assert_eq!(trained.epsilon(), 0.05);
        assert!(trained.is_training());
        assert!(report.states_learned > 0);
        assert_eq!(report.states_learned, trained.num_entries());
    }

    #[test]
    fn test_broke_learner_is_restaked() {
        let config = BlackjackSimulatorConfig::new()
            .base_bet(10)
            .starting_bankroll(10.0)
            .seed(2)
            .build();
        let strategy = QLearningStrategy::new().with_seed(2);
        let (_, report) = train_learning_strategy(&config, strategy, 500, &[]).unwrap();
        assert_eq!(report.episodes, 500);
        assert!(report.restakes > 0);
    }

    #[test]
    fn test_win_rate() {
        let report = TrainingReport {
            episodes: 10,
            wins: 3,
            losses: 6,
            pushes: 1,
            restakes: 0,
            states_learned: 4,
        };
        assert!((report.win_rate() - 1.0 / 3.0).abs() < 1e-12);
    }
}
