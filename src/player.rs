use crate::scoring::Score;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum_macros::Display)]
pub enum PlayerSlot {
    #[strum(serialize = "Player 1")]
    One,
    #[strum(serialize = "Player 2")]
    Two,
}

impl PlayerSlot {
    pub const ALL: [PlayerSlot; 2] = [PlayerSlot::One, PlayerSlot::Two];

    pub fn index(&self) -> usize {
        match self {
            PlayerSlot::One => 0,
            PlayerSlot::Two => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(PlayerSlot::One),
            1 => Some(PlayerSlot::Two),
            _ => None,
        }
    }
}

/// Outcome of a finished two-player match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Tie,
    Winner(PlayerSlot),
}

impl Verdict {
    /// Higher WPM wins; equal WPM is a tie
    pub fn decide(one: &Score, two: &Score) -> Self {
        match one.wpm.cmp(&two.wpm) {
            std::cmp::Ordering::Equal => Verdict::Tie,
            std::cmp::Ordering::Greater => Verdict::Winner(PlayerSlot::One),
            std::cmp::Ordering::Less => Verdict::Winner(PlayerSlot::Two),
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Tie => write!(f, "It's a tie!"),
            Verdict::Winner(slot) => write!(f, "{slot} wins!"),
        }
    }
}
