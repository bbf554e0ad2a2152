//! Core blackjack types shared by the simulator: cards, the shoe, hands, house rules and
//! the moves a player may take. Nothing in this crate knows about strategies or rounds.

pub mod card;
pub mod error;
pub mod hand;
pub mod rules;
pub mod shoe;

pub use card::{Card, Rank, Suit};
pub use error::BlackjackGameError;
pub use hand::Hand;
pub use rules::{
    legal_moves, HouseRules, HouseRulesBuilder, Move, SurrenderPolicy, MIN_RESHUFFLE_RESERVE,
};
pub use shoe::{Shoe, CARDS_PER_DECK};
