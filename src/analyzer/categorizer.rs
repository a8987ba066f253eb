use crate::model::{EmotionCode, Task};
use serde::{Deserialize, Serialize};
use std::fmt;

const ENERGIZING: [u8; 5] = [1, 3, 10, 13, 16];
const DRAINING: [u8; 7] = [4, 5, 6, 7, 8, 9, 15];
const MEANINGFUL: [u8; 4] = [2, 11, 12, 16];
const CURIOUS: [u8; 2] = [13, 14];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionBucket {
    Energizing,
    Draining,
    Meaningful,
    Curious,
}

impl EmotionBucket {
    pub fn members(self) -> &'static [u8] {
        match self {
            Self::Energizing => &ENERGIZING,
            Self::Draining => &DRAINING,
            Self::Meaningful => &MEANINGFUL,
            Self::Curious => &CURIOUS,
        }
    }

    pub fn contains(self, code: EmotionCode) -> bool {
        self.members().contains(&code.value())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionAxis {
    Calm,
    Happy,
    Excited,
    Frustrated,
    Anxious,
}

impl EmotionAxis {
    pub const ALL: [EmotionAxis; 5] = [
        Self::Calm,
        Self::Happy,
        Self::Excited,
        Self::Frustrated,
        Self::Anxious,
    ];

    pub fn of(code: EmotionCode) -> Self {
        match code.value() {
            2 | 12 => Self::Calm,
            1 | 11 | 16 => Self::Happy,
            3 | 10 | 13 | 14 => Self::Excited,
            4 | 8 | 9 | 15 => Self::Frustrated,
            _ => Self::Anxious,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Calm => "Calm",
            Self::Happy => "Happy",
            Self::Excited => "Excited",
            Self::Frustrated => "Frustrated",
            Self::Anxious => "Anxious",
        }
    }

    pub fn is_positive(self) -> bool {
        matches!(self, Self::Calm | Self::Happy | Self::Excited)
    }
}

impl fmt::Display for EmotionAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label().to_lowercase())
    }
}

/// Tasks grouped by semantic bucket. A multi-emotion task can appear in several.
#[derive(Debug, Default)]
pub struct CategorizedTasks<'a> {
    pub energizing: Vec<&'a Task>,
    pub draining: Vec<&'a Task>,
    pub meaningful: Vec<&'a Task>,
    pub curious: Vec<&'a Task>,
}

impl<'a> CategorizedTasks<'a> {
    pub fn counts(&self) -> BucketCounts {
        BucketCounts {
            energizing: self.energizing.len(),
            draining: self.draining.len(),
            meaningful: self.meaningful.len(),
            curious: self.curious.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCounts {
    pub energizing: usize,
    pub draining: usize,
    pub meaningful: usize,
    pub curious: usize,
}

/// Proportions over the five axes. Always sums to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionBreakdown {
    pub calm: f64,
    pub happy: f64,
    pub excited: f64,
    pub frustrated: f64,
    pub anxious: f64,
}

impl Default for EmotionBreakdown {
    fn default() -> Self {
        Self::uniform()
    }
}

impl EmotionBreakdown {
    pub fn uniform() -> Self {
        Self {
            calm: 0.2,
            happy: 0.2,
            excited: 0.2,
            frustrated: 0.2,
            anxious: 0.2,
        }
    }

    pub fn get(&self, axis: EmotionAxis) -> f64 {
        match axis {
            EmotionAxis::Calm => self.calm,
            EmotionAxis::Happy => self.happy,
            EmotionAxis::Excited => self.excited,
            EmotionAxis::Frustrated => self.frustrated,
            EmotionAxis::Anxious => self.anxious,
        }
    }

    pub fn positive_share(&self) -> f64 {
        EmotionAxis::ALL
            .into_iter()
            .filter(|axis| axis.is_positive())
            .map(|axis| self.get(axis))
            .sum()
    }

    pub fn negative_share(&self) -> f64 {
        EmotionAxis::ALL
            .into_iter()
            .filter(|axis| !axis.is_positive())
            .map(|axis| self.get(axis))
            .sum()
    }

    pub fn is_positive(&self) -> bool {
        self.positive_share() > self.negative_share()
    }

    /// Largest axis among those sharing the given polarity, with the same
    /// tie rule as `dominant`.
    pub fn dominant_with_tone(&self, positive: bool) -> EmotionAxis {
        EmotionAxis::ALL
            .into_iter()
            .filter(|axis| axis.is_positive() == positive)
            .reduce(|best, axis| {
                if self.get(axis) > self.get(best) {
                    axis
                } else {
                    best
                }
            })
            .unwrap_or_else(|| self.dominant())
    }

    /// Largest axis; on ties the earlier axis in calm, happy, excited,
    /// frustrated, anxious order wins.
    pub fn dominant(&self) -> EmotionAxis {
        EmotionAxis::ALL
            .into_iter()
            .fold(EmotionAxis::Calm, |best, axis| {
                if self.get(axis) > self.get(best) {
                    axis
                } else {
                    best
                }
            })
    }
}

pub fn categorize_tasks<'a, I>(tasks: I) -> CategorizedTasks<'a>
where
    I: IntoIterator<Item = &'a Task>,
{
    tasks
        .into_iter()
        .fold(CategorizedTasks::default(), |mut acc, task| {
            let in_bucket = |bucket: EmotionBucket| {
                task.emotions.iter().any(|code| bucket.contains(*code))
            };

            if in_bucket(EmotionBucket::Energizing) {
                acc.energizing.push(task);
            }
            if in_bucket(EmotionBucket::Draining) {
                acc.draining.push(task);
            }
            if in_bucket(EmotionBucket::Meaningful) {
                acc.meaningful.push(task);
            }
            if in_bucket(EmotionBucket::Curious) {
                acc.curious.push(task);
            }
            acc
        })
}

pub fn emotion_breakdown<'a, I>(tasks: I) -> EmotionBreakdown
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut counts = [0_usize; 5];
    for code in tasks.into_iter().flat_map(|task| task.emotions.iter()) {
        counts[axis_index(EmotionAxis::of(*code))] += 1;
    }

    let total = counts.iter().sum::<usize>();
    if total == 0 {
        return EmotionBreakdown::uniform();
    }

    let share = |index: usize| counts[index] as f64 / total as f64;
    EmotionBreakdown {
        calm: share(0),
        happy: share(1),
        excited: share(2),
        frustrated: share(3),
        anxious: share(4),
    }
}

/// Occurrences per emotion code, most frequent first; lower codes win ties.
pub fn emotion_frequencies<'a, I>(tasks: I) -> Vec<(EmotionCode, usize)>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut counts = [0_usize; 16];
    for code in tasks.into_iter().flat_map(|task| task.emotions.iter()) {
        counts[usize::from(code.value() - 1)] += 1;
    }

    let mut items = EmotionCode::all()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .collect::<Vec<_>>();
    items.sort_by(|left, right| right.1.cmp(&left.1).then_with(|| left.0.cmp(&right.0)));
    items
}

fn axis_index(axis: EmotionAxis) -> usize {
    match axis {
        EmotionAxis::Calm => 0,
        EmotionAxis::Happy => 1,
        EmotionAxis::Excited => 2,
        EmotionAxis::Frustrated => 3,
        EmotionAxis::Anxious => 4,
    }
}
