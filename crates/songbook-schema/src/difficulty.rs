//! The five fixed chart difficulties.

/// A chart difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Mania,
    Ura,
}

impl Difficulty {
    /// All difficulties in ascending order.
    pub const ALL: [Difficulty; 5] = [
        Difficulty::Easy,
        Difficulty::Normal,
        Difficulty::Hard,
        Difficulty::Mania,
        Difficulty::Ura,
    ];

    /// Name used inside schema field names (`starEasy`, `scoreUra`, ...).
    pub fn name(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
            Difficulty::Mania => "Mania",
            Difficulty::Ura => "Ura",
        }
    }

    /// Single-letter suffix used in per-difficulty blob names (`{id}_e.bin`).
    pub fn suffix(&self) -> char {
        match self {
            Difficulty::Easy => 'e',
            Difficulty::Normal => 'n',
            Difficulty::Hard => 'h',
            Difficulty::Mania => 'm',
            Difficulty::Ura => 'x',
        }
    }

    /// Looks up a difficulty by its blob suffix.
    pub fn from_suffix(suffix: char) -> Option<Difficulty> {
        Difficulty::ALL.into_iter().find(|d| d.suffix() == suffix)
    }

    /// Flat key of this difficulty's star rating.
    pub fn star_field(&self) -> &'static str {
        match self {
            Difficulty::Easy => "starEasy",
            Difficulty::Normal => "starNormal",
            Difficulty::Hard => "starHard",
            Difficulty::Mania => "starMania",
            Difficulty::Ura => "starUra",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
