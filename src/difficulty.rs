use crate::error::Error;
use num_traits::ToPrimitive;
use std::{fmt, str::FromStr};

/// A named board size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Difficulty {
    pub(crate) name: &'static str,
    pub(crate) width: usize,
    pub(crate) height: usize,
}

pub(crate) const EASY: Difficulty = Difficulty {
    name: "Easy",
    width: 10,
    height: 10,
};

pub(crate) const NORMAL: Difficulty = Difficulty {
    name: "Normal",
    width: 14,
    height: 14,
};

pub(crate) const HARD: Difficulty = Difficulty {
    name: "Hard",
    width: 18,
    height: 18,
};

pub(crate) const EXPERT: Difficulty = Difficulty {
    name: "Expert",
    width: 22,
    height: 22,
};

pub(crate) const DIFFICULTIES: [Difficulty; 4] = [EASY, NORMAL, HARD, EXPERT];

impl Difficulty {
    pub(crate) fn bombs(&self, rule: BombRule) -> usize {
        rule.bombs(self.width, self.height)
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        EASY
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        DIFFICULTIES
            .iter()
            .find(|difficulty| difficulty.name.eq_ignore_ascii_case(name.trim()))
            .copied()
            .ok_or_else(|| Error::UnknownDifficulty(name.to_owned()))
    }
}

pub(crate) const DEFAULT_DENSITY: f64 = 0.15;
pub(crate) const DEFAULT_COMBINED_DENSITY: f64 = 0.10;

/// How many bombs a board of a given size receives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum BombRule {
    /// A fixed fraction of the cells.
    Density(f64),
    /// The square root of the number of cells.
    Sqrt,
    /// The smaller of the density and square root rules.
    Combined(f64),
}

impl Default for BombRule {
    fn default() -> Self {
        Self::Density(DEFAULT_DENSITY)
    }
}

impl BombRule {
    /// Build a rule from its name, using `density` where the rule takes one.
    pub(crate) fn from_name(name: &str, density: Option<f64>) -> Result<Self, Error> {
        match name.trim().to_ascii_lowercase().as_str() {
            "density" => Ok(Self::Density(density.unwrap_or(DEFAULT_DENSITY))),
            "sqrt" => Ok(Self::Sqrt),
            "combined" => Ok(Self::Combined(
                density.unwrap_or(DEFAULT_COMBINED_DENSITY),
            )),
            _ => Err(Error::UnknownBombRule(name.to_owned())),
        }
    }

    /// The bomb count for a `width` x `height` board, always within `[1, area - 1]`.
    pub(crate) fn bombs(&self, width: usize, height: usize) -> usize {
        let area = width * height;
        let area_f64 = area.to_f64().unwrap_or(0.0);

        let by_density = |density: f64| (area_f64 * density).floor().to_usize().unwrap_or(0);
        let by_sqrt = || area_f64.sqrt().floor().to_usize().unwrap_or(0);

        let raw = match *self {
            Self::Density(density) => by_density(density),
            Self::Sqrt => by_sqrt(),
            Self::Combined(density) => by_density(density).min(by_sqrt()),
        };

        raw.min(area.saturating_sub(1)).max(1)
    }
}

impl fmt::Display for BombRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Density(density) => write!(f, "density {density}"),
            Self::Sqrt => write!(f, "sqrt"),
            Self::Combined(density) => write!(f, "combined {density}"),
        }
    }
}
