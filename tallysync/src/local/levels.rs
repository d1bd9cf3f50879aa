use serde::{Deserialize, Serialize};

/// Progression tier derived from the points balance.
///
/// Each tier covers the range `(previous threshold, own threshold]` of the
/// next tier, so a balance sitting exactly on a threshold still belongs to the
/// lower tier with a sublevel of `2.00` (or `1.00` for [`SkillLevel::Nobody`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Nobody,
    Beginner,
    Novice,
    Intermediate,
    Proficient,
    Advance,
    Expert,
    Master,
    Guru,
    Legendary,
    LikeAGod,
}

/// Points per sublevel step once [`SkillLevel::LikeAGod`] is reached.
const TOP_STEP: f64 = 1_000_000.0;

impl SkillLevel {
    pub const ALL: [SkillLevel; 11] = [
        SkillLevel::Nobody,
        SkillLevel::Beginner,
        SkillLevel::Novice,
        SkillLevel::Intermediate,
        SkillLevel::Proficient,
        SkillLevel::Advance,
        SkillLevel::Expert,
        SkillLevel::Master,
        SkillLevel::Guru,
        SkillLevel::Legendary,
        SkillLevel::LikeAGod,
    ];

    pub fn min_points(self) -> f64 {
        match self {
            SkillLevel::Nobody => 0.0,
            SkillLevel::Beginner => 10.0,
            SkillLevel::Novice => 100.0,
            SkillLevel::Intermediate => 500.0,
            SkillLevel::Proficient => 1_000.0,
            SkillLevel::Advance => 5_000.0,
            SkillLevel::Expert => 10_000.0,
            SkillLevel::Master => 50_000.0,
            SkillLevel::Guru => 100_000.0,
            SkillLevel::Legendary => 500_000.0,
            SkillLevel::LikeAGod => 1_000_000.0,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            SkillLevel::Nobody => "Nobody",
            SkillLevel::Beginner => "Beginner",
            SkillLevel::Novice => "Novice",
            SkillLevel::Intermediate => "Intermediate",
            SkillLevel::Proficient => "Proficient",
            SkillLevel::Advance => "Advance",
            SkillLevel::Expert => "Expert",
            SkillLevel::Master => "Master",
            SkillLevel::Guru => "Guru",
            SkillLevel::Legendary => "Legendary",
            SkillLevel::LikeAGod => "Like a God",
        }
    }

    /// `None` at the top tier.
    pub fn next(self) -> Option<SkillLevel> {
        let index = Self::ALL.iter().position(|l| *l == self)?;
        Self::ALL.get(index + 1).copied()
    }

    /// Tier and fractional sublevel for `points`.
    ///
    /// Below the first threshold the sublevel runs from 0 to 1; in every other
    /// tier it runs from 1 to 2 across the tier's range.
    pub fn from_points(points: f64) -> (SkillLevel, f64) {
        let points = points.max(0.0);
        let beginner = SkillLevel::Beginner.min_points();
        if points <= beginner {
            return (SkillLevel::Nobody, points / beginner);
        }
        for level in Self::ALL.into_iter().skip(1) {
            let Some(next) = level.next() else { break };
            let (low, high) = (level.min_points(), next.min_points());
            if points <= high {
                return (level, 1.0 + (points - low) / (high - low));
            }
        }
        let top = SkillLevel::LikeAGod;
        (top, 1.0 + (points - top.min_points()) / TOP_STEP)
    }

    /// E.g. `Beginner 1.50`.
    pub fn label(self, sublevel: f64) -> String {
        format!("{} {sublevel:.2}", self.display_name())
    }
}

/// Everything a profile screen shows about the current tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub level: SkillLevel,
    pub sublevel: f64,
    pub label: String,
    pub points: f64,
    /// `None` at the top tier.
    pub next_level: Option<SkillLevel>,
    /// Percentage (0..=100) of the way to the next tier, or through the
    /// current million at the top tier.
    pub progress: f64,
    pub points_to_next: f64,
}

impl LevelInfo {
    pub fn from_points(points: f64) -> Self {
        let points = points.max(0.0);
        let (level, sublevel) = SkillLevel::from_points(points);
        let next_level = level.next();

        let (progress, points_to_next) = match next_level {
            Some(next) => {
                let (low, high) = (level.min_points(), next.min_points());
                let progress = ((points - low) / (high - low) * 100.0).clamp(0.0, 100.0);
                (progress, (high - points).max(0.0))
            }
            None => {
                let into_step = (points - level.min_points()) % TOP_STEP;
                (into_step / TOP_STEP * 100.0, TOP_STEP - into_step)
            }
        };

        Self {
            level,
            sublevel,
            label: level.label(sublevel),
            points,
            next_level,
            progress,
            points_to_next,
        }
    }
}
