use crate::card::Card;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// An ordered collection of the cards dealt to the player or the dealer during one round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    /// Associated function to create a new, empty `Hand`.
    pub fn new() -> Hand {
        Hand { cards: Vec::new() }
    }

    /// Method for receiving a card, cards are only ever appended.
    pub fn add(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    fn num_aces(&self) -> u32 {
        self.cards.iter().filter(|c| c.is_ace()).count() as u32
    }

    /// Every total the hand can take, counting all aces as 11 and then one ace lower per
    /// step. Descending, distinct, positive.
    fn computed_totals(&self) -> Vec<u32> {
        let hard: u32 = self.cards.iter().map(|c| c.hard_value() as u32).sum();
        let mut totals: Vec<u32> = (0..=self.num_aces())
            .map(|k| hard as i64 - 10 * k as i64)
            .filter(|t| *t > 0)
            .map(|t| t as u32)
            .collect();
        totals.sort_unstable_by(|a, b| b.cmp(a));
        totals.dedup();
        totals
    }

    /// The valid totals of the hand in descending order. Totals above 21 are only reported
    /// when every total busts, so a bust hand still has something to compare.
    pub fn totals(&self) -> Vec<u32> {
        let totals = self.computed_totals();
        let valid: Vec<u32> = totals.iter().copied().filter(|t| *t <= 21).collect();
        if valid.is_empty() {
            totals
        } else {
            valid
        }
    }

    /// The largest total not exceeding 21, or the smallest total if every total busts.
    /// An empty hand has a best total of 0.
    pub fn best_total(&self) -> u32 {
        let totals = self.totals();
        totals
            .iter()
            .copied()
            .find(|t| *t <= 21)
            .or_else(|| totals.last().copied())
            .unwrap_or(0)
    }

    /// A natural, exactly two cards worth 21.
    pub fn is_blackjack(&self) -> bool {
        self.cards.len() == 2 && self.best_total() == 21
    }

    pub fn is_bust(&self) -> bool {
        self.best_total() > 21
    }

    /// True if at least one ace can count as 11 without taking the hand over 21.
    pub fn is_soft(&self) -> bool {
        let aces = self.num_aces();
        if aces == 0 {
            return false;
        }
        let low: u32 = self
            .cards
            .iter()
            .map(|c| if c.is_ace() { 1 } else { c.hard_value() as u32 })
            .sum();
        low + 10 <= 21
    }

    /// Method for getting the formatted hand, intended for logging purposes
    pub fn formatted_cards(&self) -> String {
        self.cards
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<String>>()
            .join(" ")
    }
}

impl FromIterator<Card> for Hand {
    fn from_iter<I: IntoIterator<Item = Card>>(iter: I) -> Self {
        Hand {
            cards: iter.into_iter().collect(),
        }
    }
}

impl Display for Hand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.formatted_cards(), self.best_total())
    }
}
