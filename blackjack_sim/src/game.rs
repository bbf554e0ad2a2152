//! Module that plays single rounds of blackjack for one strategy. The engine owns the shoe and the
//! bankroll, asks the strategy for bets and moves, and reports every step of the round to the
//! registered observers.

pub mod events;
pub mod strategy;

pub mod prelude {
    pub use super::events::{
        EventRecorder, GameObserver, ObserverId, Outcome, Recipient, RoundEvent,
    };
    pub use super::strategy::{
        BasicChart, BasicHitStand, BettingStrategy, CountingStrategy, DecisionStrategy,
        FixedStrategy, FlatBetting, HardSoftChart, HiLo, HiLoStrategy, MarginBettingStrategy,
        PlayerStrategy, QLearningStrategy, RandomStrategy, Strategy, TableState,
    };
    pub use super::{BlackjackGame, RoundResult, DEFAULT_BANKROLL};
    pub use blackjack_lib::{BlackjackGameError, Card, Hand, HouseRules, Move, Shoe};
}

use blackjack_lib::{legal_moves, BlackjackGameError, Hand, HouseRules, Move, Shoe};
use events::{GameObserver, ObserverId, Outcome, Recipient, RoundEvent};
use log::{debug, trace, warn};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use strategy::{Strategy, TableState};

/// Bankroll a new engine starts with.
pub const DEFAULT_BANKROLL: f64 = 1000.0;

/// What a finished round hands back to the caller, the same data `RoundEnd` carries plus the
/// bet the round was settled at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundResult {
    pub outcome: Outcome,
    pub player_hand: Option<Hand>,
    pub dealer_hand: Option<Hand>,
    pub bankroll: f64,
    pub bet: u32,
}

/// Dealer draws below 17, and on a soft 17 only when the table says so.
pub fn dealer_should_hit(hand: &Hand, rules: &HouseRules) -> bool {
    let total = hand.best_total();
    total < 17 || (total == 17 && hand.is_soft() && rules.dealer_hits_soft_17)
}

/// Struct that provides the functionality to play rounds of blackjack for a specific strategy.
pub struct BlackjackGame<S: Strategy> {
    rules: HouseRules,
    strategy: S,
    shoe: Shoe,
    base_bet: u32,
    bet: u32,
    bankroll: f64,
    observers: Vec<(ObserverId, Rc<RefCell<dyn GameObserver>>)>,
    next_observer_id: usize,
}

impl<S: Strategy> BlackjackGame<S> {
    /// Associated method for building a new game. Fails if `rules` are not playable or `base_bet` is zero.
    /// The shoe is shuffled from entropy, use `with_seed` or `with_shoe` for reproducible games.
    pub fn new(
        rules: HouseRules,
        strategy: S,
        base_bet: u32,
    ) -> Result<BlackjackGame<S>, BlackjackGameError> {
        rules.validate()?;
        if base_bet == 0 {
            return Err(BlackjackGameError::InvalidBet(base_bet));
        }
        let shoe = Shoe::from_entropy(rules.num_decks);
        Ok(BlackjackGame {
            rules,
            strategy,
            shoe,
            base_bet,
            bet: base_bet,
            bankroll: DEFAULT_BANKROLL,
            observers: Vec::new(),
            next_observer_id: 0,
        })
    }

    pub fn with_bankroll(mut self, bankroll: f64) -> Self {
        self.bankroll = bankroll;
        self
    }

    /// Replaces the shoe with a freshly shuffled one built from `seed`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.shoe = Shoe::seeded(self.rules.num_decks, seed);
        self
    }

    /// Plays from `shoe` instead, it must hold as many decks as the rules ask for.
    pub fn with_shoe(mut self, shoe: Shoe) -> Result<Self, BlackjackGameError> {
        if shoe.num_decks() != self.rules.num_decks {
            return Err(BlackjackGameError::InvalidRules(format!(
                "shoe holds {} deck(s) but the rules ask for {}",
                shoe.num_decks(),
                self.rules.num_decks
            )));
        }
        self.shoe = shoe;
        Ok(self)
    }

    /// Subscribes `observer` to every event from now on. Observers are notified in the order they were added.
    pub fn add_observer(&mut self, observer: Rc<RefCell<dyn GameObserver>>) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push((id, observer));
        id
    }

    /// Unsubscribes an observer, returns false if `id` was not registered.
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    pub fn bankroll(&self) -> f64 {
        self.bankroll
    }

    pub fn set_bankroll(&mut self, bankroll: f64) {
        self.bankroll = bankroll;
    }

    /// The bet currently on the table. Between rounds this is the base unit.
    pub fn active_bet(&self) -> u32 {
        self.bet
    }

    pub fn base_bet(&self) -> u32 {
        self.base_bet
    }

    pub fn shoe(&self) -> &Shoe {
        &self.shoe
    }

    pub fn rules(&self) -> &HouseRules {
        &self.rules
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn strategy_mut(&mut self) -> &mut S {
        &mut self.strategy
    }

    pub fn into_strategy(self) -> S {
        self.strategy
    }

    pub fn label(&self) -> String {
        self.strategy.label()
    }

    /// Plays one complete round and settles it. Every way a round can end is an `Ok` outcome,
    /// an `Err` means the engine or the strategy broke an invariant and the game should stop.
    pub fn play_round(&mut self) -> Result<RoundResult, BlackjackGameError> {
        self.check_reshuffle();

        let bet = self
            .strategy
            .decide_bet_amount(self.base_bet, self.shoe.remaining());
        if bet == 0 {
            return Err(BlackjackGameError::InvalidBet(bet));
        }
        self.bet = bet;

        if self.bankroll < bet as f64 {
            debug!(
                "{}: bankroll {:.2} cannot cover a bet of {}",
                self.strategy.label(),
                self.bankroll,
                bet
            );
            return Ok(self.settle(Outcome::Broke, None));
        }

        let mut player_hand = Hand::new();
        let mut dealer_hand = Hand::new();
        self.deal_card(&mut player_hand, Recipient::Player)?;
        self.deal_card(&mut dealer_hand, Recipient::Dealer)?;
        self.deal_card(&mut player_hand, Recipient::Player)?;
        self.deal_card(&mut dealer_hand, Recipient::Dealer)?;

        if let Some(outcome) = self.player_turn(&mut player_hand, &dealer_hand)? {
            return Ok(self.settle(outcome, Some((player_hand, dealer_hand))));
        }
        if let Some(outcome) = self.dealer_turn(&mut dealer_hand)? {
            return Ok(self.settle(outcome, Some((player_hand, dealer_hand))));
        }

        let player_total = player_hand.best_total();
        let dealer_total = dealer_hand.best_total();
        let outcome = if player_total > dealer_total {
            Outcome::Win
        } else if player_total < dealer_total {
            Outcome::Loss
        } else {
            Outcome::Push
        };
        Ok(self.settle(outcome, Some((player_hand, dealer_hand))))
    }

    fn check_reshuffle(&mut self) {
        if !self.shoe.needs_reshuffle(self.rules.reshuffle_threshold) {
            return;
        }
        debug!(
            "reshuffling with {} of {} cards left",
            self.shoe.remaining(),
            self.shoe.capacity()
        );
        self.shoe.rebuild();
        if let Some(counter) = self.strategy.counter() {
            counter.reset();
        }
        self.notify(RoundEvent::ShoeReshuffled {
            num_decks: self.rules.num_decks,
        });
    }

    fn deal_card(&mut self, hand: &mut Hand, recipient: Recipient) -> Result<(), BlackjackGameError> {
        let card = self.shoe.draw()?;
        hand.add(card);
        trace!("{:?} dealt {}", recipient, card);
        if let Some(counter) = self.strategy.counter() {
            counter.update(card);
        }
        self.notify(RoundEvent::CardDealt { card, recipient });
        Ok(())
    }

    /// Returns the outcome if the round ends during the player's turn.
    fn player_turn(
        &mut self,
        player_hand: &mut Hand,
        dealer_hand: &Hand,
    ) -> Result<Option<Outcome>, BlackjackGameError> {
        if player_hand.is_blackjack() {
            if dealer_hand.is_blackjack() {
                return Ok(Some(Outcome::Push));
            }
            return Ok(Some(Outcome::Blackjack));
        }

        let dealer_up_card = dealer_hand.cards()[0];
        loop {
            let state = TableState::new(
                player_hand,
                dealer_up_card,
                &self.rules,
                self.bet,
                self.bankroll,
            );
            let mv = self.strategy.decide_move(&state);
            if !legal_moves(player_hand, &self.rules).contains(&mv) {
                return Err(BlackjackGameError::IllegalMove {
                    mv,
                    cards: player_hand.len(),
                });
            }

            match mv {
                Move::Hit => {
                    self.deal_card(player_hand, Recipient::Player)?;
                    if player_hand.is_bust() {
                        break;
                    }
                }
                Move::Stand => break,
                Move::Surrender => return Ok(Some(Outcome::SurrLoss)),
                Move::Double => {
                    // without the money to cover it the double is just a single hit
                    let doubled = self
                        .bet
                        .checked_mul(2)
                        .filter(|doubled| self.bankroll >= *doubled as f64);
                    if let Some(doubled) = doubled {
                        let original_bet = self.bet;
                        self.bet = doubled;
                        self.notify(RoundEvent::DoubleDown {
                            original_bet,
                            new_bet: self.bet,
                        });
                    }
                    self.deal_card(player_hand, Recipient::Player)?;
                    break;
                }
                Move::Split => {
                    warn!(
                        "{} asked to split {}, splitting is not supported so the hand stands",
                        self.strategy.label(),
                        player_hand
                    );
                    break;
                }
            }
        }

        if player_hand.is_bust() {
            Ok(Some(Outcome::Loss))
        } else {
            Ok(None)
        }
    }

    /// Returns the outcome if the round ends during the dealer's turn.
    fn dealer_turn(&mut self, dealer_hand: &mut Hand) -> Result<Option<Outcome>, BlackjackGameError> {
        if dealer_hand.is_blackjack() {
            return Ok(Some(Outcome::Loss));
        }
        while dealer_should_hit(dealer_hand, &self.rules) {
            self.deal_card(dealer_hand, Recipient::Dealer)?;
        }
        if dealer_hand.is_bust() {
            Ok(Some(Outcome::Win))
        } else {
            Ok(None)
        }
    }

    /// The only place the bankroll changes. Hands are dropped for rounds that never reached a showdown.
    fn settle(&mut self, outcome: Outcome, hands: Option<(Hand, Hand)>) -> RoundResult {
        let bet = self.bet;
        self.bankroll += outcome.bankroll_delta(bet, self.rules.blackjack_payout);
        self.bet = self.base_bet;

        let (player_hand, dealer_hand) = match hands {
            Some((player, dealer)) if outcome != Outcome::SurrLoss => (Some(player), Some(dealer)),
            _ => (None, None),
        };
        match (&player_hand, &dealer_hand) {
            (Some(player), Some(dealer)) => debug!(
                "{} at {}: player {} dealer {}, bankroll {:.2}",
                outcome, bet, player, dealer, self.bankroll
            ),
            _ => debug!("{} at {}, bankroll {:.2}", outcome, bet, self.bankroll),
        }

        self.notify(RoundEvent::RoundEnd {
            outcome,
            player_hand: player_hand.clone(),
            dealer_hand: dealer_hand.clone(),
            bankroll: self.bankroll,
        });
        RoundResult {
            outcome,
            player_hand,
            dealer_hand,
            bankroll: self.bankroll,
            bet,
        }
    }

    fn notify(&mut self, event: RoundEvent) {
        if let Some(observer) = self.strategy.observer() {
            observer.on_event(&event);
        }
        for (_, observer) in self.observers.iter() {
            observer.borrow_mut().on_event(&event);
        }
    }
}
