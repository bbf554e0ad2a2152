use crate::card::{Card, Rank, Suit};
use crate::error::BlackjackGameError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

pub const CARDS_PER_DECK: usize = 52;

/// The pool of cards left to deal, built from `num_decks` shuffled decks.
/// Cards are drawn from the back of `cards`.
#[derive(Debug, Clone)]
pub struct Shoe {
    cards: Vec<Card>,
    num_decks: u32,
    rng: StdRng,
}

fn fresh_decks(num_decks: u32) -> Vec<Card> {
    let mut cards = Vec::with_capacity(num_decks as usize * CARDS_PER_DECK);
    for _ in 0..num_decks {
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                cards.push(Card::new(rank, suit));
            }
        }
    }
    cards
}

impl Shoe {
    /// Builds a shuffled shoe that draws its randomness from `rng`.
    pub fn new(num_decks: u32, rng: StdRng) -> Shoe {
        let mut shoe = Shoe {
            cards: Vec::new(),
            num_decks,
            rng,
        };
        shoe.rebuild();
        shoe
    }

    /// Builds a shuffled shoe from a fixed seed, two shoes built from the same seed deal the
    /// same cards in the same order.
    pub fn seeded(num_decks: u32, seed: u64) -> Shoe {
        Shoe::new(num_decks, StdRng::seed_from_u64(seed))
    }

    /// Builds a shuffled shoe seeded from the operating system.
    pub fn from_entropy(num_decks: u32) -> Shoe {
        Shoe::new(num_decks, StdRng::from_entropy())
    }

    /// Builds a full seeded shoe whose first draws are exactly `top`, in order. Each listed
    /// card is taken out of the shuffled shoe so the composition of the shoe is unchanged.
    pub fn stacked(num_decks: u32, top: &[Card], seed: u64) -> Result<Shoe, BlackjackGameError> {
        let mut shoe = Shoe::seeded(num_decks, seed);
        for card in top {
            match shoe.cards.iter().position(|c| c == card) {
                Some(idx) => {
                    shoe.cards.remove(idx);
                }
                None => {
                    return Err(BlackjackGameError::InvalidRules(format!(
                        "{} appears more often than a {}-deck shoe holds",
                        card, num_decks
                    )))
                }
            }
        }
        shoe.cards.extend(top.iter().rev().copied());
        Ok(shoe)
    }

    /// Replaces the remaining cards with a complete, freshly shuffled shoe.
    pub fn rebuild(&mut self) {
        self.cards = fresh_decks(self.num_decks);
        self.cards.shuffle(&mut self.rng);
    }

    /// Removes and returns the next card.
    pub fn draw(&mut self) -> Result<Card, BlackjackGameError> {
        self.cards.pop().ok_or(BlackjackGameError::ExhaustedShoe)
    }

    /// The card that the next call to `draw` will return.
    pub fn peek(&self) -> Option<&Card> {
        self.cards.last()
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    /// Number of cards in a complete shoe.
    pub fn capacity(&self) -> usize {
        self.num_decks as usize * CARDS_PER_DECK
    }

    pub fn num_decks(&self) -> u32 {
        self.num_decks
    }

    /// True when the fraction of the shoe left is at or below `threshold`.
    pub fn needs_reshuffle(&self, threshold: f64) -> bool {
        (self.remaining() as f64) / (self.capacity() as f64) <= threshold
    }
}
