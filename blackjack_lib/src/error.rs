use crate::rules::Move;
use thiserror::Error;

/// Errors raised by the blackjack core.
///
/// `InvalidRules` is a configuration error and is reported when rules or an engine are built.
/// The other variants are invariant violations: a round that hits one cannot be completed and
/// the caller should stop the simulation rather than retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlackjackGameError {
    #[error("invalid house rules: {0}")]
    InvalidRules(String),
    #[error("attempted to draw from an exhausted shoe")]
    ExhaustedShoe,
    #[error("move {mv} is not legal for a hand of {cards} card(s) under the current rules")]
    IllegalMove { mv: Move, cards: usize },
    #[error("strategy returned an invalid bet of {0}")]
    InvalidBet(u32),
}
