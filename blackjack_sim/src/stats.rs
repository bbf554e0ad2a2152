use crate::game::events::{GameObserver, Outcome, RoundEvent};
use crate::SimulationSummary;

/// Observer that records the results of every settled round. Wins include blackjacks and losses
/// include surrenders, a round that could not be dealt because the bankroll ran out is not a hand.
#[derive(Debug, Clone)]
pub struct SimulationStatistics {
    starting_bankroll: f64,
    pub wins: u32,
    pub losses: u32,
    pub pushes: u32,
    pub doubles: u32,
    pub blackjacks: u32,
    pub surrenders: u32,
    pub ended_early: bool,
    bankroll_history: Vec<f64>,
    cumulative_win_rates: Vec<f64>,
}

impl SimulationStatistics {
    pub fn new(starting_bankroll: f64) -> SimulationStatistics {
        SimulationStatistics {
            starting_bankroll,
            wins: 0,
            losses: 0,
            pushes: 0,
            doubles: 0,
            blackjacks: 0,
            surrenders: 0,
            ended_early: false,
            bankroll_history: Vec::new(),
            cumulative_win_rates: Vec::new(),
        }
    }

    pub fn total_hands(&self) -> u32 {
        self.wins + self.losses + self.pushes
    }

    /// Wins over decided hands, pushes are left out. Zero before any hand is decided.
    pub fn win_rate(&self) -> f64 {
        let decided = self.wins + self.losses;
        if decided == 0 {
            0.0
        } else {
            self.wins as f64 / decided as f64
        }
    }

    pub fn final_bankroll(&self) -> f64 {
        self.bankroll_history
            .last()
            .copied()
            .unwrap_or(self.starting_bankroll)
    }

    pub fn net_profit(&self) -> f64 {
        self.final_bankroll() - self.starting_bankroll
    }

    /// Bankroll after every round, including the one that ended the run for lack of funds.
    pub fn bankroll_history(&self) -> &[f64] {
        &self.bankroll_history
    }

    /// Win rate after each settled hand.
    pub fn cumulative_win_rates(&self) -> &[f64] {
        &self.cumulative_win_rates
    }

    /// Method to get a `SimulationSummary` object derived from the data recorded so far.
    pub fn summary(&self, label: &str) -> SimulationSummary {
        SimulationSummary {
            label: label.to_string(),
            total_hands: self.total_hands(),
            wins: self.wins,
            losses: self.losses,
            pushes: self.pushes,
            doubles: self.doubles,
            blackjacks: self.blackjacks,
            surrenders: self.surrenders,
            win_rate: self.win_rate(),
            starting_bankroll: self.starting_bankroll,
            final_bankroll: self.final_bankroll(),
            net_profit: self.net_profit(),
            ended_early: self.ended_early,
            bankroll_history: self.bankroll_history.clone(),
            cumulative_win_rates: self.cumulative_win_rates.clone(),
        }
    }
}

impl GameObserver for SimulationStatistics {
    fn on_event(&mut self, event: &RoundEvent) {
        match event {
            RoundEvent::DoubleDown { .. } => self.doubles += 1,
            RoundEvent::RoundEnd {
                outcome, bankroll, ..
            } => {
                match outcome {
                    Outcome::Win => self.wins += 1,
                    Outcome::Blackjack => {
                        self.wins += 1;
                        self.blackjacks += 1;
                    }
                    Outcome::Loss => self.losses += 1,
                    Outcome::SurrLoss => {
                        self.losses += 1;
                        self.surrenders += 1;
                    }
                    Outcome::Push => self.pushes += 1,
                    Outcome::Broke => {
                        self.ended_early = true;
                        self.bankroll_history.push(*bankroll);
                        return;
                    }
                }
                self.bankroll_history.push(*bankroll);
                let win_rate = self.win_rate();
                self.cumulative_win_rates.push(win_rate);
            }
            _ => {}
        }
    }
}
