use super::{Strategy, TableState};
use crate::game::events::{GameObserver, Outcome, RoundEvent};
use crate::model::{ModelError, PolicyModel, QEntry, MODEL_VERSION};
use blackjack_lib::{Card, Hand, HouseRules, Move};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_LEARNING_RATE: f64 = 0.1;
pub const DEFAULT_DISCOUNT_FACTOR: f64 = 0.95;
pub const DEFAULT_EPSILON: f64 = 0.1;

const UNSEEN_VALUE: f64 = -0.1;
const UNSEEN_SURRENDER_VALUE: f64 = -0.5;

/// What the learner sees of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    pub player_total: u32,
    pub dealer_value: u8,
    pub is_soft: bool,
}

impl StateKey {
    pub fn new(hand: &Hand, dealer_up_card: &Card) -> StateKey {
        StateKey {
            player_total: hand.best_total(),
            dealer_value: dealer_up_card.hard_value(),
            is_soft: hand.is_soft(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Decision {
    state: StateKey,
    action: Move,
}

/// Tabular Q-learning player. In training mode it explores with probability `epsilon`, logs
/// every decision of the round and learns from the outcome once the round ends.
#[derive(Debug, Clone)]
pub struct QLearningStrategy {
    q_table: HashMap<(StateKey, Move), f64>,
    learning_rate: f64,
    discount_factor: f64,
    epsilon: f64,
    training: bool,
    episode: Vec<Decision>,
    rng: StdRng,
}

impl QLearningStrategy {
    pub fn new() -> QLearningStrategy {
        QLearningStrategy::with_hyperparameters(
            DEFAULT_LEARNING_RATE,
            DEFAULT_DISCOUNT_FACTOR,
            DEFAULT_EPSILON,
        )
    }

    pub fn with_hyperparameters(
        learning_rate: f64,
        discount_factor: f64,
        epsilon: f64,
    ) -> QLearningStrategy {
        QLearningStrategy {
            q_table: HashMap::new(),
            learning_rate,
            discount_factor,
            epsilon,
            training: true,
            episode: Vec::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Method for making exploration reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Method for switching between training mode and play mode. In play mode the learner always
    /// takes its best known action and never updates its table.
    pub fn training_mode(mut self, training: bool) -> Self {
        self.set_training_mode(training);
        self
    }

    pub fn set_training_mode(&mut self, training: bool) {
        self.training = training;
        if !training {
            self.episode.clear();
        }
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn discount_factor(&self) -> f64 {
        self.discount_factor
    }

    /// Number of state/action pairs with a learned value.
    pub fn num_entries(&self) -> usize {
        self.q_table.len()
    }

    /// Number of decisions logged for the round in progress.
    pub fn episode_len(&self) -> usize {
        self.episode.len()
    }

    /// The learned value of `action` in `state`. Pairs never updated carry a small negative
    /// prior, surrender a larger one.
    pub fn q_value(&self, state: &StateKey, action: Move) -> f64 {
        match self.q_table.get(&(*state, action)) {
            Some(value) => *value,
            None if action == Move::Surrender => UNSEEN_SURRENDER_VALUE,
            None => UNSEEN_VALUE,
        }
    }

    pub fn set_q_value(&mut self, state: StateKey, action: Move, value: f64) {
        self.q_table.insert((state, action), value);
    }

    /// Hit and stand are always available, double and surrender only on the opening two cards.
    pub fn valid_actions(hand: &Hand, rules: &HouseRules) -> Vec<Move> {
        let mut actions = vec![Move::Hit, Move::Stand];
        if hand.len() == 2 {
            actions.push(Move::Double);
            if rules.surrender.allows_surrender() {
                actions.push(Move::Surrender);
            }
        }
        actions
    }

    /// The action with the highest value, ties go to the earliest action in `actions`.
    pub fn best_action(&self, state: &StateKey, actions: &[Move]) -> Move {
        let mut best = Move::Stand;
        let mut best_value = f64::NEG_INFINITY;
        for action in actions {
            let value = self.q_value(state, *action);
            if value > best_value {
                best = *action;
                best_value = value;
            }
        }
        best
    }

    /// Reward the learner receives for finishing a round with `outcome`.
    pub fn reward(outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Win => 1.0,
            Outcome::Blackjack => 1.5,
            Outcome::Push => 0.0,
            Outcome::Loss => -1.0,
            Outcome::SurrLoss => -0.5,
            Outcome::Broke => -10.0,
        }
    }

    /// Updates the table from the decisions logged this round, last decision first. Every
    /// decision is credited with the round's reward plus the discounted value of the state
    /// that followed it.
    pub fn learn_from_hand(&mut self, outcome: Outcome) {
        if !self.training {
            self.episode.clear();
            return;
        }
        let reward = QLearningStrategy::reward(outcome);
        let episode = std::mem::take(&mut self.episode);
        for (i, decision) in episode.iter().enumerate().rev() {
            let max_future = match episode.get(i + 1) {
                Some(next) => f64::max(
                    self.q_value(&next.state, Move::Hit),
                    self.q_value(&next.state, Move::Stand),
                ),
                None => 0.0,
            };
            let current = self.q_value(&decision.state, decision.action);
            let updated = current
                + self.learning_rate * (reward + self.discount_factor * max_future - current);
            self.q_table.insert((decision.state, decision.action), updated);
        }
        debug!(
            "learned from {} decision(s), outcome {}, {} entries",
            episode.len(),
            outcome,
            self.q_table.len()
        );
    }

    pub fn to_model(&self) -> PolicyModel {
        let mut entries: Vec<QEntry> = self
            .q_table
            .iter()
            .map(|((state, action), value)| QEntry {
                state: *state,
                action: *action,
                value: *value,
            })
            .collect();
        entries.sort_by_key(|e| {
            (
                e.state.player_total,
                e.state.dealer_value,
                e.state.is_soft,
                e.action as u8,
            )
        });
        PolicyModel {
            version: MODEL_VERSION,
            learning_rate: self.learning_rate,
            discount_factor: self.discount_factor,
            epsilon: self.epsilon,
            entries,
        }
    }

    /// Builds a learner from a saved model, in training mode.
    pub fn from_model(model: &PolicyModel) -> QLearningStrategy {
        let mut strategy = QLearningStrategy::with_hyperparameters(
            model.learning_rate,
            model.discount_factor,
            model.epsilon,
        );
        strategy.replace_table(model);
        strategy
    }

    fn replace_table(&mut self, model: &PolicyModel) {
        self.q_table = model
            .entries
            .iter()
            .map(|e| ((e.state, e.action), e.value))
            .collect();
    }

    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        self.to_model().save(path)
    }

    /// Replaces the learned table with the one stored at `path`, keeping the current
    /// hyperparameters. On failure the table is left untouched and the error is returned.
    pub fn load_model<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, ModelError> {
        let path = path.as_ref();
        match PolicyModel::load(path) {
            Ok(model) => {
                self.replace_table(&model);
                debug!("loaded {} entries from {}", self.q_table.len(), path.display());
                Ok(self.q_table.len())
            }
            Err(e) => {
                warn!("could not load model from {}: {}", path.display(), e);
                Err(e)
            }
        }
    }
}

impl Default for QLearningStrategy {
    fn default() -> Self {
        QLearningStrategy::new()
    }
}

impl Strategy for QLearningStrategy {
    fn decide_move(&mut self, state: &TableState<'_>) -> Move {
        let key = StateKey::new(state.hand, &state.dealer_up_card);
        let actions = QLearningStrategy::valid_actions(state.hand, state.rules);

        let action = if self.training && self.rng.gen::<f64>() < self.epsilon {
            actions.choose(&mut self.rng).copied().unwrap_or(Move::Stand)
        } else {
            self.best_action(&key, &actions)
        };

        if self.training {
            self.episode.push(Decision { state: key, action });
        }
        action
    }

    fn decide_bet_amount(&mut self, base_unit: u32, _shoe_remaining: usize) -> u32 {
        base_unit
    }

    fn observer(&mut self) -> Option<&mut dyn GameObserver> {
        Some(self)
    }

    fn label(&self) -> String {
        if self.training {
            "Q-Learning (Training)".to_string()
        } else {
            "Q-Learning (Playing)".to_string()
        }
    }
}

impl GameObserver for QLearningStrategy {
    fn on_event(&mut self, event: &RoundEvent) {
        if let RoundEvent::RoundEnd { outcome, .. } = event {
            self.learn_from_hand(*outcome);
        }
    }
}
