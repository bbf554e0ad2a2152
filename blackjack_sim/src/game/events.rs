use blackjack_lib::{Card, Hand};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Who received a dealt card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    Player,
    Dealer,
}

/// How a round was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Loss,
    Push,
    Blackjack,
    #[serde(rename = "surr_loss")]
    SurrLoss,
    Broke,
}

impl Outcome {
    /// Every outcome a round can end with.
    pub const ALL: [Outcome; 6] = [
        Outcome::Win,
        Outcome::Loss,
        Outcome::Push,
        Outcome::Blackjack,
        Outcome::SurrLoss,
        Outcome::Broke,
    ];

    /// Change in bankroll when a round with this outcome settles at `bet`.
    pub fn bankroll_delta(&self, bet: u32, blackjack_payout: f64) -> f64 {
        let bet = bet as f64;
        match self {
            Outcome::Win => bet,
            Outcome::Loss => -bet,
            Outcome::Blackjack => bet * blackjack_payout,
            Outcome::SurrLoss => -0.5 * bet,
            Outcome::Push | Outcome::Broke => 0.0,
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Outcome::Win => "win",
            Outcome::Loss => "loss",
            Outcome::Push => "push",
            Outcome::Blackjack => "blackjack",
            Outcome::SurrLoss => "surr_loss",
            Outcome::Broke => "broke",
        };
        write!(f, "{}", name)
    }
}

/// Something that happened during a round, delivered to every observer as it happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundEvent {
    CardDealt {
        card: Card,
        recipient: Recipient,
    },
    ShoeReshuffled {
        num_decks: u32,
    },
    DoubleDown {
        original_bet: u32,
        new_bet: u32,
    },
    /// Emitted exactly once per round, after the bankroll has been settled. Hands are absent
    /// when the round ended before or without a showdown (`broke`, `surr_loss`).
    RoundEnd {
        outcome: Outcome,
        player_hand: Option<Hand>,
        dealer_hand: Option<Hand>,
        bankroll: f64,
    },
}

/// Trait for anything that wants to watch rounds being played, e.g. statistics collectors and
/// learning strategies. Observers are notified synchronously, in registration order.
pub trait GameObserver {
    fn on_event(&mut self, event: &RoundEvent);
}

/// Handle returned by `BlackjackGame::add_observer`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) usize);

/// Observer that keeps every event it sees, handy for inspecting a round after the fact.
#[derive(Debug, Default, Clone)]
pub struct EventRecorder {
    pub events: Vec<RoundEvent>,
}

impl EventRecorder {
    pub fn new() -> EventRecorder {
        EventRecorder { events: Vec::new() }
    }

    /// Cards dealt since the recorder was created or last cleared, in deal order.
    pub fn cards_dealt(&self) -> Vec<(Card, Recipient)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                RoundEvent::CardDealt { card, recipient } => Some((*card, *recipient)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl GameObserver for EventRecorder {
    fn on_event(&mut self, event: &RoundEvent) {
        self.events.push(event.clone());
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use blackjack_lib::{Rank, Suit};

    #[test]
    fn test_outcome_names() {
        let names: Vec<String> = Outcome::ALL
            .iter()
            .map(|o| serde_json::to_string(o).unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "\"win\"",
                "\"loss\"",
                "\"push\"",
                "\"blackjack\"",
                "\"surr_loss\"",
                "\"broke\""
            ]
        );
        for outcome in Outcome::ALL {
            assert_eq!(format!("\"{}\"", outcome), serde_json::to_string(&outcome).unwrap());
        }
    }

    #[test]
    fn test_bankroll_deltas() {
        assert_eq!(Outcome::Win.bankroll_delta(10, 1.5), 10.0);
        assert_eq!(Outcome::Loss.bankroll_delta(10, 1.5), -10.0);
        assert_eq!(Outcome::Blackjack.bankroll_delta(10, 1.5), 15.0);
        assert_eq!(Outcome::Blackjack.bankroll_delta(10, 1.2), 12.0);
        assert_eq!(Outcome::Push.bankroll_delta(10, 1.5), 0.0);
        assert_eq!(Outcome::SurrLoss.bankroll_delta(10, 1.5), -5.0);
        assert_eq!(Outcome::Broke.bankroll_delta(10, 1.5), 0.0);
    }

    #[test]
    fn test_recorder() {
        let mut recorder = EventRecorder::new();
        let card = Card::new(Rank::Five, Suit::Clubs);
        recorder.on_event(&RoundEvent::ShoeReshuffled { num_decks: 6 });
        recorder.on_event(&RoundEvent::CardDealt {
            card,
            recipient: Recipient::Dealer,
        });
        assert_eq!(recorder.events.len(), 2);
        assert_eq!(recorder.cards_dealt(), vec![(card, Recipient::Dealer)]);
        recorder.clear();
        assert!(recorder.events.is_empty());
    }
}
