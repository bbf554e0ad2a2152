pub mod chart;
pub mod learning;

use crate::game::events::GameObserver;
use blackjack_lib::{legal_moves, Card, Hand, HouseRules, Move, CARDS_PER_DECK};
use lazy_static::lazy_static;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::fmt::Display;

pub use chart::{BasicChart, HardSoftChart};
pub use learning::{QLearningStrategy, StateKey};

lazy_static! {
    /// Hi-Lo tags keyed by the hard value of a card, aces are 11.
    static ref HI_LO_TAGS: HashMap<u8, i32> = {
        let mut tags = HashMap::new();
        for i in 2..7 {
            tags.insert(i, 1);
        }
        for i in 7..10 {
            tags.insert(i, 0);
        }
        tags.insert(10, -1);
        tags.insert(11, -1);
        tags
    };
}

/// Struct for encapsulating all the information a strategy is given to make a decision.
/// Everything is read only, the engine owns the hands and the bankroll.
#[derive(Debug, Clone, Copy)]
pub struct TableState<'a> {
    pub hand: &'a Hand,
    pub dealer_up_card: Card,
    pub rules: &'a HouseRules,
    pub bet: u32,
    pub bankroll: f64,
}

impl<'a> TableState<'a> {
    pub fn new(
        hand: &'a Hand,
        dealer_up_card: Card,
        rules: &'a HouseRules,
        bet: u32,
        bankroll: f64,
    ) -> TableState<'a> {
        TableState {
            hand,
            dealer_up_card,
            rules,
            bet,
            bankroll,
        }
    }

    /// The moves the engine will accept for the current hand.
    pub fn legal_moves(&self) -> Vec<Move> {
        legal_moves(self.hand, self.rules)
    }

    pub fn can_surrender(&self) -> bool {
        self.legal_moves().contains(&Move::Surrender)
    }
}

/// Trait for a generic decision strategy. Has only one required method `decide_move()`, which takes in
/// the state of the table i.e. the players hand and the dealers face up card, and returns a move.
pub trait DecisionStrategy {
    fn decide_move(&self, state: &TableState<'_>) -> Move;
    fn label(&self) -> String;
}

/// Trait for a generic betting strategy, the bet is computed from the base betting unit and the current true count.
pub trait BettingStrategy {
    fn bet(&self, base_unit: u32, true_count: f32) -> u32;
}

/// Trait for a specific counting strategy. The engine feeds every dealt card through `update` and
/// calls `reset` whenever the shoe is rebuilt.
pub trait CountingStrategy {
    fn update(&mut self, card: Card);
    fn reset(&mut self);
    fn running_count(&self) -> f32;
    /// The running count per deck still in the shoe, never dividing by less than one deck.
    fn true_count(&self, shoe_remaining: usize) -> f32 {
        let decks_remaining = shoe_remaining as f32 / CARDS_PER_DECK as f32;
        self.running_count() / f32::max(decks_remaining, 1.0)
    }
    fn label(&self) -> String;
}

/// The interface the round engine plays against. `counter` and `observer` are optional
/// capabilities, a strategy that returns `Some` is fed every dealt card or every round event.
pub trait Strategy {
    fn decide_move(&mut self, state: &TableState<'_>) -> Move;
    fn decide_bet_amount(&mut self, base_unit: u32, shoe_remaining: usize) -> u32;
    fn counter(&mut self) -> Option<&mut dyn CountingStrategy> {
        None
    }
    fn observer(&mut self) -> Option<&mut dyn GameObserver> {
        None
    }
    fn label(&self) -> String;
}

impl Strategy for Box<dyn Strategy + Send> {
    fn decide_move(&mut self, state: &TableState<'_>) -> Move {
        (**self).decide_move(state)
    }

    fn decide_bet_amount(&mut self, base_unit: u32, shoe_remaining: usize) -> u32 {
        (**self).decide_bet_amount(base_unit, shoe_remaining)
    }

    fn counter(&mut self) -> Option<&mut dyn CountingStrategy> {
        (**self).counter()
    }

    fn observer(&mut self) -> Option<&mut dyn GameObserver> {
        (**self).observer()
    }

    fn label(&self) -> String {
        (**self).label()
    }
}

/// Always bets the base unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatBetting;

impl BettingStrategy for FlatBetting {
    fn bet(&self, base_unit: u32, _true_count: f32) -> u32 {
        base_unit
    }
}

/// Struct that encapsulates the logic needed for a simple margin based betting strategy, i.e. for each positive value that the
/// true count takes the bet is `base_unit * margin * true_count`, never less than the base unit.
#[derive(Debug, Clone, Copy)]
pub struct MarginBettingStrategy {
    margin: f32,
}

impl MarginBettingStrategy {
    /// Associated method for returning a new `MarginBettingStrategy` struct
    pub fn new(margin: f32) -> MarginBettingStrategy {
        MarginBettingStrategy { margin }
    }
}

impl Default for MarginBettingStrategy {
    fn default() -> Self {
        MarginBettingStrategy::new(1.0)
    }
}

impl BettingStrategy for MarginBettingStrategy {
    fn bet(&self, base_unit: u32, true_count: f32) -> u32 {
        let scalar = f32::max(1.0, true_count);
        let bet = f32::floor(scalar * self.margin * base_unit as f32) as u32;
        u32::max(bet, base_unit)
    }
}

/// The Hi-Lo count: low cards (2-6) count +1, tens and aces count -1, everything else is neutral.
#[derive(Debug, Clone, Default)]
pub struct HiLo {
    running_count: i32,
    total_cards_counted: u32,
}

impl HiLo {
    /// Associated Method for building a new HiLo counting object
    pub fn new() -> HiLo {
        HiLo {
            running_count: 0,
            total_cards_counted: 0,
        }
    }

    pub fn total_cards_counted(&self) -> u32 {
        self.total_cards_counted
    }
}

impl CountingStrategy for HiLo {
    fn update(&mut self, card: Card) {
        self.running_count += HI_LO_TAGS.get(&card.hard_value()).copied().unwrap_or(0);
        self.total_cards_counted += 1;
    }

    fn reset(&mut self) {
        self.running_count = 0;
        self.total_cards_counted = 0;
    }

    fn running_count(&self) -> f32 {
        self.running_count as f32
    }

    fn label(&self) -> String {
        self.to_string()
    }
}

impl Display for HiLo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HiLo")
    }
}

/// Struct that composes a counting, a decision and a betting strategy into a single `Strategy`.
#[derive(Debug, Clone)]
pub struct PlayerStrategy<C, D, B>
where
    C: CountingStrategy,
    D: DecisionStrategy,
    B: BettingStrategy,
{
    counting_strategy: C,
    decision_strategy: D,
    betting_strategy: B,
}

impl<C, D, B> PlayerStrategy<C, D, B>
where
    C: CountingStrategy,
    D: DecisionStrategy,
    B: BettingStrategy,
{
    pub fn new(counting_strategy: C, decision_strategy: D, betting_strategy: B) -> Self {
        PlayerStrategy {
            counting_strategy,
            decision_strategy,
            betting_strategy,
        }
    }

    pub fn counting_strategy(&self) -> &C {
        &self.counting_strategy
    }
}

impl<C, D, B> Strategy for PlayerStrategy<C, D, B>
where
    C: CountingStrategy,
    D: DecisionStrategy,
    B: BettingStrategy,
{
    fn decide_move(&mut self, state: &TableState<'_>) -> Move {
        self.decision_strategy.decide_move(state)
    }

    fn decide_bet_amount(&mut self, base_unit: u32, shoe_remaining: usize) -> u32 {
        let true_count = self.counting_strategy.true_count(shoe_remaining);
        self.betting_strategy.bet(base_unit, true_count)
    }

    fn counter(&mut self) -> Option<&mut dyn CountingStrategy> {
        Some(&mut self.counting_strategy)
    }

    fn label(&self) -> String {
        format!(
            "{} ({})",
            self.counting_strategy.label(),
            self.decision_strategy.label()
        )
    }
}

/// The Hi-Lo counter betting by margin and playing the hard/soft chart.
pub type HiLoStrategy = PlayerStrategy<HiLo, HardSoftChart, MarginBettingStrategy>;

impl HiLoStrategy {
    pub fn hi_lo() -> HiLoStrategy {
        PlayerStrategy::new(HiLo::new(), HardSoftChart, MarginBettingStrategy::default())
    }
}

/// Wraps a decision strategy that does not count cards, always betting the base unit.
#[derive(Debug, Clone, Default)]
pub struct FixedStrategy<D: DecisionStrategy> {
    decision_strategy: D,
}

impl<D: DecisionStrategy> FixedStrategy<D> {
    pub fn new(decision_strategy: D) -> FixedStrategy<D> {
        FixedStrategy { decision_strategy }
    }
}

impl<D: DecisionStrategy> Strategy for FixedStrategy<D> {
    fn decide_move(&mut self, state: &TableState<'_>) -> Move {
        self.decision_strategy.decide_move(state)
    }

    fn decide_bet_amount(&mut self, base_unit: u32, _shoe_remaining: usize) -> u32 {
        FlatBetting.bet(base_unit, 0.0)
    }

    fn label(&self) -> String {
        self.decision_strategy.label()
    }
}

/// Hits below 12, stands on 17 and up, and in between stands only against a weak dealer card (2-6).
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicHitStand;

impl DecisionStrategy for BasicHitStand {
    fn decide_move(&self, state: &TableState<'_>) -> Move {
        let total = state.hand.best_total();
        if total >= 17 {
            Move::Stand
        } else if total < 12 {
            Move::Hit
        } else if state.dealer_up_card.hard_value() < 7 {
            Move::Stand
        } else {
            Move::Hit
        }
    }

    fn label(&self) -> String {
        "Basic".to_string()
    }
}

/// Plays a uniformly random legal move, never splitting.
#[derive(Debug, Clone)]
pub struct RandomStrategy {
    rng: StdRng,
}

impl RandomStrategy {
    pub fn new() -> RandomStrategy {
        RandomStrategy {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> RandomStrategy {
        RandomStrategy {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomStrategy {
    fn default() -> Self {
        RandomStrategy::new()
    }
}

impl Strategy for RandomStrategy {
    fn decide_move(&mut self, state: &TableState<'_>) -> Move {
        let moves: Vec<Move> = state
            .legal_moves()
            .into_iter()
            .filter(|m| *m != Move::Split)
            .collect();
        moves.choose(&mut self.rng).copied().unwrap_or(Move::Stand)
    }

    fn decide_bet_amount(&mut self, base_unit: u32, _shoe_remaining: usize) -> u32 {
        base_unit
    }

    fn label(&self) -> String {
        "Random".to_string()
    }
}
