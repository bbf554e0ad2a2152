use crate::error::BlackjackGameError;
use crate::hand::Hand;
use crate::shoe::CARDS_PER_DECK;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// When, if ever, a player may give up half their bet instead of playing the hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurrenderPolicy {
    #[default]
    None,
    Late,
    Early,
}

impl SurrenderPolicy {
    pub fn allows_surrender(&self) -> bool {
        *self != SurrenderPolicy::None
    }
}

/// Fewest cards the reshuffle threshold must keep in the shoe, so a round never draws from an
/// empty shoe. A single deck at the default threshold holds exactly this many.
pub const MIN_RESHUFFLE_RESERVE: usize = 13;

/// A playing decision returned by a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Hit,
    Stand,
    Double,
    Surrender,
    /// Reserved. Splitting is not played, a split request ends the turn like a stand.
    Split,
}

impl Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Move::Hit => "hit",
            Move::Stand => "stand",
            Move::Double => "double",
            Move::Surrender => "surrender",
            Move::Split => "split",
        };
        write!(f, "{}", name)
    }
}

/// The moves the engine accepts for `hand` under `rules`. Surrender is only available on the
/// first decision, while the hand still holds its two opening cards.
pub fn legal_moves(hand: &Hand, rules: &HouseRules) -> Vec<Move> {
    let mut moves = vec![Move::Hit, Move::Stand, Move::Double];
    if rules.surrender.allows_surrender() && hand.len() == 2 {
        moves.push(Move::Surrender);
    }
    moves.push(Move::Split);
    moves
}

/// Immutable configuration of the table. Deserializes from JSON with every field optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HouseRules {
    pub num_decks: u32,
    pub dealer_hits_soft_17: bool,
    pub blackjack_payout: f64,
    pub surrender: SurrenderPolicy,
    /// Fraction of the full shoe remaining at or below which the shoe is rebuilt.
    pub reshuffle_threshold: f64,
    // Split rules, accepted for forward compatibility. Splitting is not played.
    pub double_after_split: bool,
    pub resplit_aces: bool,
    pub hit_split_aces: bool,
    pub max_splits: u32,
}

impl Default for HouseRules {
    fn default() -> Self {
        HouseRules {
            num_decks: 6,
            dealer_hits_soft_17: false,
            blackjack_payout: 1.5,
            surrender: SurrenderPolicy::None,
            reshuffle_threshold: 0.25,
            double_after_split: true,
            resplit_aces: false,
            hit_split_aces: false,
            max_splits: 3,
        }
    }
}

impl HouseRules {
    /// Associated method for returning a new `HouseRulesBuilder`, any option left unset takes
    /// the default value.
    pub fn builder() -> HouseRulesBuilder {
        HouseRulesBuilder::default()
    }

    /// Checks that the rules describe a playable table.
    pub fn validate(&self) -> Result<(), BlackjackGameError> {
        if self.num_decks == 0 {
            return Err(BlackjackGameError::InvalidRules(
                "num_decks must be at least 1".to_string(),
            ));
        }
        if !self.blackjack_payout.is_finite() || self.blackjack_payout <= 0.0 {
            return Err(BlackjackGameError::InvalidRules(format!(
                "blackjack_payout must be a positive number, got {}",
                self.blackjack_payout
            )));
        }
        if !(0.0..1.0).contains(&self.reshuffle_threshold) {
            return Err(BlackjackGameError::InvalidRules(format!(
                "reshuffle_threshold must lie in [0, 1), got {}",
                self.reshuffle_threshold
            )));
        }
        let capacity = self.num_decks as usize * CARDS_PER_DECK;
        let reserve = self.reshuffle_threshold * capacity as f64;
        if reserve < MIN_RESHUFFLE_RESERVE as f64 {
            return Err(BlackjackGameError::InvalidRules(format!(
                "reshuffle_threshold {} keeps {:.1} of {} cards in reserve, at least {} are needed",
                self.reshuffle_threshold, reserve, capacity, MIN_RESHUFFLE_RESERVE
            )));
        }
        Ok(())
    }
}

/// Struct to implement builder pattern for `HouseRules`
#[derive(Debug, Clone, Copy, Default)]
pub struct HouseRulesBuilder {
    num_decks: Option<u32>,
    dealer_hits_soft_17: Option<bool>,
    blackjack_payout: Option<f64>,
    surrender: Option<SurrenderPolicy>,
    reshuffle_threshold: Option<f64>,
    double_after_split: Option<bool>,
    resplit_aces: Option<bool>,
    hit_split_aces: Option<bool>,
    max_splits: Option<u32>,
}

impl HouseRulesBuilder {
    /// Method for choosing the number of decks used in the shoe
    pub fn num_decks(&mut self, decks: u32) -> &mut Self {
        self.num_decks = Some(decks);
        self
    }

    /// Method for setting the flag that determines if the dealer must hit soft seventeens, default is false
    pub fn dealer_hits_soft_17(&mut self, hits: bool) -> &mut Self {
        self.dealer_hits_soft_17 = Some(hits);
        self
    }

    /// Method for setting the multiple of the bet paid out on a natural
    pub fn blackjack_payout(&mut self, payout: f64) -> &mut Self {
        self.blackjack_payout = Some(payout);
        self
    }

    /// Method for setting when surrender is allowed
    pub fn surrender(&mut self, policy: SurrenderPolicy) -> &mut Self {
        self.surrender = Some(policy);
        self
    }

    /// Method for setting the remaining fraction of the shoe that triggers a reshuffle
    pub fn reshuffle_threshold(&mut self, threshold: f64) -> &mut Self {
        self.reshuffle_threshold = Some(threshold);
        self
    }

    pub fn double_after_split(&mut self, allowed: bool) -> &mut Self {
        self.double_after_split = Some(allowed);
        self
    }

    pub fn resplit_aces(&mut self, allowed: bool) -> &mut Self {
        self.resplit_aces = Some(allowed);
        self
    }

    pub fn hit_split_aces(&mut self, allowed: bool) -> &mut Self {
        self.hit_split_aces = Some(allowed);
        self
    }

    pub fn max_splits(&mut self, splits: u32) -> &mut Self {
        self.max_splits = Some(splits);
        self
    }

    /// Method for building a `HouseRules` object, fails if the resulting rules are not playable.
    pub fn build(&mut self) -> Result<HouseRules, BlackjackGameError> {
        let defaults = HouseRules::default();
        let rules = HouseRules {
            num_decks: self.num_decks.unwrap_or(defaults.num_decks),
            dealer_hits_soft_17: self
                .dealer_hits_soft_17
                .unwrap_or(defaults.dealer_hits_soft_17),
            blackjack_payout: self.blackjack_payout.unwrap_or(defaults.blackjack_payout),
            surrender: self.surrender.unwrap_or(defaults.surrender),
            reshuffle_threshold: self
                .reshuffle_threshold
                .unwrap_or(defaults.reshuffle_threshold),
            double_after_split: self
                .double_after_split
                .unwrap_or(defaults.double_after_split),
            resplit_aces: self.resplit_aces.unwrap_or(defaults.resplit_aces),
            hit_split_aces: self.hit_split_aces.unwrap_or(defaults.hit_split_aces),
            max_splits: self.max_splits.unwrap_or(defaults.max_splits),
        };
        rules.validate()?;
        Ok(rules)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::card::{Card, Rank, Suit};

    #[test]
    fn test_defaults() {
        let rules = HouseRules::default();
        assert_eq!(rules.num_decks, 6);
        assert!(!rules.dealer_hits_soft_17);
        assert_eq!(rules.blackjack_payout, 1.5);
        assert_eq!(rules.surrender, SurrenderPolicy::None);
        assert_eq!(rules.reshuffle_threshold, 0.25);
        assert_eq!(rules.max_splits, 3);
        assert!(rules.validate().is_ok());
    }

    #[test]
    fn test_builder_rejects_bad_values() {
        assert!(matches!(
            HouseRules::builder().num_decks(0).build(),
            Err(BlackjackGameError::InvalidRules(_))
        ));
        assert!(HouseRules::builder().blackjack_payout(-1.0).build().is_err());
        assert!(HouseRules::builder().reshuffle_threshold(1.0).build().is_err());
        assert!(HouseRules::builder().reshuffle_threshold(-0.1).build().is_err());
        assert!(HouseRules::builder().reshuffle_threshold(0.0).build().is_err());

        let rules = HouseRules::builder()
            .num_decks(1)
            .dealer_hits_soft_17(true)
            .surrender(SurrenderPolicy::Late)
            .build()
            .unwrap();
        assert_eq!(rules.num_decks, 1);
        assert!(rules.dealer_hits_soft_17);
        assert_eq!(rules.blackjack_payout, 1.5);
    }

    #[test]
    fn test_reshuffle_reserve() {
        // one deck needs at least a quarter of the shoe held back
        assert!(HouseRules::builder()
            .num_decks(1)
            .reshuffle_threshold(0.0)
            .build()
            .is_err());
        assert!(HouseRules::builder()
            .num_decks(1)
            .reshuffle_threshold(0.2)
            .build()
            .is_err());
        assert!(HouseRules::builder()
            .num_decks(1)
            .reshuffle_threshold(0.25)
            .build()
            .is_ok());
        // larger shoes reach the reserve with a smaller fraction
        assert!(HouseRules::builder()
            .num_decks(6)
            .reshuffle_threshold(0.05)
            .build()
            .is_ok());
        assert!(HouseRules::builder()
            .num_decks(6)
            .reshuffle_threshold(0.04)
            .build()
            .is_err());

        let rules: HouseRules =
            serde_json::from_str(r#"{"num_decks": 1, "reshuffle_threshold": 0.0}"#).unwrap();
        assert!(matches!(
            rules.validate(),
            Err(BlackjackGameError::InvalidRules(_))
        ));
    }

    #[test]
    fn test_json_with_missing_fields() {
        let rules: HouseRules =
            serde_json::from_str(r#"{"num_decks": 2, "surrender": "late", "max_splits": 1}"#)
                .unwrap();
        assert_eq!(rules.num_decks, 2);
        assert_eq!(rules.surrender, SurrenderPolicy::Late);
        assert_eq!(rules.max_splits, 1);
        assert_eq!(rules.reshuffle_threshold, 0.25);

        // deck counts can never be negative
        assert!(serde_json::from_str::<HouseRules>(r#"{"num_decks": -2}"#).is_err());
    }

    #[test]
    fn test_legal_moves() {
        let mut hand = Hand::new();
        hand.add(Card::new(Rank::Ten, Suit::Clubs));
        hand.add(Card::new(Rank::Six, Suit::Hearts));

        let no_surrender = HouseRules::default();
        assert!(!legal_moves(&hand, &no_surrender).contains(&Move::Surrender));

        let late = HouseRules::builder()
            .surrender(SurrenderPolicy::Late)
            .build()
            .unwrap();
        assert!(legal_moves(&hand, &late).contains(&Move::Surrender));

        hand.add(Card::new(Rank::Two, Suit::Hearts));
        let moves = legal_moves(&hand, &late);
        assert!(!moves.contains(&Move::Surrender));
        assert!(moves.contains(&Move::Double));
        assert!(moves.contains(&Move::Hit));
    }
}
