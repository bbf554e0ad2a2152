use super::{DecisionStrategy, TableState};
use blackjack_lib::{Card, Move};
use lazy_static::lazy_static;

/// Number of dealer up card columns in a chart: 2 through 9, ten valued cards, ace.
const COLUMNS: usize = 10;

// Rows of player totals, one character per dealer column.
// h: hit, s: stand, d: double, r: surrender (hit when surrender is not offered)
const BASIC_ROWS: [&str; 18] = [
    "hhhhhhhhhh", // 4
    "hhhhhhhhhh",
    "hhhhhhhhhh",
    "hhhhhhhhhh",
    "hhhhhhhhhh", // 8
    "dddddhhhhh",
    "dddddhhhhh",
    "dddddhhhhh",
    "ssssshhhhh", // 12
    "ssssshhhhh",
    "ssssshhhhh",
    "ssssshhhhh",
    "ssssshhhhh", // 16
    "ssssssssss",
    "ssssssssss",
    "ssssssssss",
    "ssssssssss",
    "ssssssssss", // 21
];

const HARD_ROWS: [&str; 18] = [
    "hhhhhhhhhh", // 4
    "hhhhhhhhhh",
    "hhhhhhhhhh",
    "hhhhhhhhhh",
    "hhhhhhhhhh", // 8
    "hddddhhhhh",
    "ddddddddhh",
    "dddddddddh",
    "hhssshhhhh", // 12
    "ssssshhhhh",
    "ssssshhhhh",
    "ssssshhhrh",
    "ssssshhrrr", // 16
    "ssssssssss",
    "ssssssssss",
    "ssssssssss",
    "ssssssssss",
    "ssssssssss", // 21
];

const SOFT_ROWS: [&str; 9] = [
    "hhhddhhhhh", // 13
    "hhhddhhhhh",
    "hhdddhhhhh",
    "hhdddhhhhh",
    "hddddhhhhh", // 17
    "sddddsshhs",
    "ssssssssss",
    "ssssssssss",
    "ssssssssss", // 21
];

lazy_static! {
    static ref BASIC: Chart = Chart::parse(4, &BASIC_ROWS);
    static ref HARD: Chart = Chart::parse(4, &HARD_ROWS);
    static ref SOFT: Chart = Chart::parse(13, &SOFT_ROWS);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChartAction {
    Hit,
    Stand,
    Double,
    Surrender,
}

impl ChartAction {
    fn from_code(code: u8) -> ChartAction {
        match code {
            b's' => ChartAction::Stand,
            b'd' => ChartAction::Double,
            b'r' => ChartAction::Surrender,
            _ => ChartAction::Hit,
        }
    }
}

/// A lookup table from (player total, dealer column) to an action, rows start at `first_total`.
struct Chart {
    first_total: u32,
    rows: Vec<[ChartAction; COLUMNS]>,
}

impl Chart {
    fn parse(first_total: u32, rows: &[&str]) -> Chart {
        let rows = rows
            .iter()
            .map(|row| {
                let mut actions = [ChartAction::Hit; COLUMNS];
                for (slot, code) in actions.iter_mut().zip(row.bytes()) {
                    *slot = ChartAction::from_code(code);
                }
                actions
            })
            .collect();
        Chart { first_total, rows }
    }

    /// Totals below the first row hit, totals past the last row stand.
    fn lookup(&self, total: u32, column: usize) -> ChartAction {
        if total < self.first_total {
            return ChartAction::Hit;
        }
        match self.rows.get((total - self.first_total) as usize) {
            Some(row) => row[column],
            None => ChartAction::Stand,
        }
    }
}

/// Column of the dealer's up card: 2-9 map to 0-7, ten valued cards to 8 and the ace to 9.
pub fn dealer_column(card: &Card) -> usize {
    match card.hard_value() {
        11 => 9,
        10 => 8,
        n => (n as usize).saturating_sub(2),
    }
}

fn resolve(action: ChartAction, state: &TableState<'_>) -> Move {
    match action {
        ChartAction::Hit => Move::Hit,
        ChartAction::Stand => Move::Stand,
        ChartAction::Double => Move::Double,
        ChartAction::Surrender if state.can_surrender() => Move::Surrender,
        ChartAction::Surrender => Move::Hit,
    }
}

/// A single chart indexed by best total, soft and hard hands are played alike.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicChart;

impl DecisionStrategy for BasicChart {
    fn decide_move(&self, state: &TableState<'_>) -> Move {
        let column = dealer_column(&state.dealer_up_card);
        resolve(BASIC.lookup(state.hand.best_total(), column), state)
    }

    fn label(&self) -> String {
        "Basic Chart".to_string()
    }
}

/// Separate hard and soft charts. A soft hand below 13 (a pair of aces) always hits.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardSoftChart;

impl DecisionStrategy for HardSoftChart {
    fn decide_move(&self, state: &TableState<'_>) -> Move {
        let column = dealer_column(&state.dealer_up_card);
        let total = state.hand.best_total();
        let action = if state.hand.is_soft() {
            SOFT.lookup(total, column)
        } else {
            HARD.lookup(total, column)
        };
        resolve(action, state)
    }

    fn label(&self) -> String {
        "Hard/Soft Chart".to_string()
    }
}
