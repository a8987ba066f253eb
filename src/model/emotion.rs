use serde::{Deserialize, Serialize};
use std::fmt;

use super::ModelError;

pub const EMOTION_COUNT: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawEmotionCode", into = "u8")]
pub struct EmotionCode(u8);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmotionInfo {
    pub code: EmotionCode,
    pub label: &'static str,
    pub emoji: &'static str,
    pub icon: &'static str,
}

const TAXONOMY: [(&str, &str, &str); 16] = [
    ("Happy", "😊", "icons/emotions/happy.svg"),
    ("Calm", "😌", "icons/emotions/calm.svg"),
    ("Excited", "🤩", "icons/emotions/excited.svg"),
    ("Frustrated", "😤", "icons/emotions/frustrated.svg"),
    ("Anxious", "😰", "icons/emotions/anxious.svg"),
    ("Tired", "😴", "icons/emotions/tired.svg"),
    ("Sad", "😢", "icons/emotions/sad.svg"),
    ("Annoyed", "😒", "icons/emotions/annoyed.svg"),
    ("Drained", "🪫", "icons/emotions/drained.svg"),
    ("Energized", "⚡", "icons/emotions/energized.svg"),
    ("Grateful", "🙏", "icons/emotions/grateful.svg"),
    ("Focused", "🎯", "icons/emotions/focused.svg"),
    ("Inspired", "💡", "icons/emotions/inspired.svg"),
    ("Curious", "🧐", "icons/emotions/curious.svg"),
    ("Bored", "🥱", "icons/emotions/bored.svg"),
    ("Proud", "🏆", "icons/emotions/proud.svg"),
];

impl EmotionCode {
    pub const HAPPY: Self = Self(1);
    pub const CALM: Self = Self(2);
    pub const EXCITED: Self = Self(3);
    pub const FRUSTRATED: Self = Self(4);
    pub const ANXIOUS: Self = Self(5);
    pub const TIRED: Self = Self(6);
    pub const SAD: Self = Self(7);
    pub const ANNOYED: Self = Self(8);
    pub const DRAINED: Self = Self(9);
    pub const ENERGIZED: Self = Self(10);
    pub const GRATEFUL: Self = Self(11);
    pub const FOCUSED: Self = Self(12);
    pub const INSPIRED: Self = Self(13);
    pub const CURIOUS: Self = Self(14);
    pub const BORED: Self = Self(15);
    pub const PROUD: Self = Self(16);

    pub fn new(value: u8) -> Result<Self, ModelError> {
        (1..=EMOTION_COUNT)
            .contains(&value)
            .then_some(Self(value))
            .ok_or(ModelError::InvalidEmotionCode(value.to_string()))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn info(self) -> EmotionInfo {
        let (label, emoji, icon) = TAXONOMY[usize::from(self.0 - 1)];
        EmotionInfo {
            code: self,
            label,
            emoji,
            icon,
        }
    }

    pub fn label(self) -> &'static str {
        self.info().label
    }

    pub fn emoji(self) -> &'static str {
        self.info().emoji
    }

    pub fn all() -> impl Iterator<Item = EmotionCode> {
        (1..=EMOTION_COUNT).map(Self)
    }

    /// Resolves a label such as "excited" or a numeric code such as "3".
    pub fn from_label(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if let Ok(number) = trimmed.parse::<u8>() {
            return Self::new(number).ok();
        }

        Self::all().find(|code| code.label().eq_ignore_ascii_case(trimmed))
    }
}

impl fmt::Display for EmotionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.emoji(), self.label())
    }
}

impl From<EmotionCode> for u8 {
    fn from(value: EmotionCode) -> Self {
        value.0
    }
}

impl TryFrom<u8> for EmotionCode {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

// Older stores occasionally persisted codes as strings ("3"), so both shapes are accepted.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEmotionCode {
    Number(i64),
    Text(String),
}

impl TryFrom<RawEmotionCode> for EmotionCode {
    type Error = ModelError;

    fn try_from(raw: RawEmotionCode) -> Result<Self, Self::Error> {
        match raw {
            RawEmotionCode::Number(number) => u8::try_from(number)
                .map_err(|_| ModelError::InvalidEmotionCode(number.to_string()))
                .and_then(Self::new),
            RawEmotionCode::Text(text) => text
                .trim()
                .parse::<u8>()
                .map_err(|_| ModelError::InvalidEmotionCode(text.clone()))
                .and_then(Self::new),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EmotionCode;

    #[test]
    fn taxonomy_covers_sixteen_codes() {
        let labels = EmotionCode::all()
            .map(|code| code.label())
            .collect::<Vec<_>>();

        assert_eq!(labels.len(), 16);
        assert_eq!(EmotionCode::EXCITED.label(), "Excited");
        assert_eq!(EmotionCode::PROUD.label(), "Proud");
    }

    #[test]
    fn rejects_out_of_range_codes() {
        assert!(EmotionCode::new(0).is_err());
        assert!(EmotionCode::new(17).is_err());
        assert!(EmotionCode::new(16).is_ok());
    }

    #[test]
    fn deserializes_numbers_and_numeric_strings() {
        let from_number: EmotionCode = serde_json::from_str("3").expect("number");
        let from_text: EmotionCode = serde_json::from_str("\"3\"").expect("string");

        assert_eq!(from_number, EmotionCode::EXCITED);
        assert_eq!(from_text, EmotionCode::EXCITED);
        assert!(serde_json::from_str::<EmotionCode>("\"happy\"").is_err());
        assert!(serde_json::from_str::<EmotionCode>("42").is_err());
    }

    #[test]
    fn label_lookup_is_case_insensitive() {
        assert_eq!(EmotionCode::from_label("drained"), Some(EmotionCode::DRAINED));
        assert_eq!(EmotionCode::from_label(" 12 "), Some(EmotionCode::FOCUSED));
        assert_eq!(EmotionCode::from_label("ecstatic"), None);
    }
}
