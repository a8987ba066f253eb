use crate::analyzer::categorizer::EmotionAxis;
use crate::model::{EmotionCode, Task};
use serde::{Deserialize, Serialize};

pub const DEFAULT_COLOR: &str = "#E3E3E3";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorFamily {
    Calm,
    Happy,
    Excited,
    Frustrated,
    Anxious,
}

impl ColorFamily {
    pub const ALL: [ColorFamily; 5] = [
        Self::Calm,
        Self::Happy,
        Self::Excited,
        Self::Frustrated,
        Self::Anxious,
    ];

    pub fn hex(self) -> &'static str {
        match self {
            Self::Calm => "#7EC8E3",
            Self::Happy => "#FFD166",
            Self::Excited => "#FF8C42",
            Self::Frustrated => "#EF476F",
            Self::Anxious => "#9B72CF",
        }
    }

    /// Family for an emotion label; unknown labels have none.
    pub fn for_emotion(code: EmotionCode) -> Self {
        match EmotionAxis::of(code) {
            EmotionAxis::Calm => Self::Calm,
            EmotionAxis::Happy => Self::Happy,
            EmotionAxis::Excited => Self::Excited,
            EmotionAxis::Frustrated => Self::Frustrated,
            EmotionAxis::Anxious => Self::Anxious,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorShare {
    pub family: ColorFamily,
    pub hex: String,
    pub proportion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorBlend {
    pub hex: String,
    pub shares: Vec<ColorShare>,
}

/// Blends the primary emotion of every task into one color.
///
/// Channels are averaged in RGB space, weighted by the share of tasks per
/// family, and rounded half-up.
pub fn blend_daily_color<'a, I>(tasks: I) -> ColorBlend
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut counts = [0_usize; 5];
    let mut total = 0_usize;
    for task in tasks {
        let family = ColorFamily::for_emotion(task.primary_emotion());
        counts[family_index(family)] += 1;
        total += 1;
    }

    if total == 0 {
        return ColorBlend {
            hex: DEFAULT_COLOR.to_string(),
            shares: Vec::new(),
        };
    }

    let shares = ColorFamily::ALL
        .into_iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(family, count)| ColorShare {
            family,
            hex: family.hex().to_string(),
            proportion: count as f64 / total as f64,
        })
        .collect::<Vec<_>>();

    let mut channels = [0.0_f64; 3];
    for share in &shares {
        let rgb = parse_hex(share.family.hex());
        for (channel, value) in channels.iter_mut().zip(rgb) {
            *channel += f64::from(value) * share.proportion;
        }
    }

    let [red, green, blue] = channels.map(|value| value.round().clamp(0.0, 255.0) as u8);
    ColorBlend {
        hex: format!("#{red:02X}{green:02X}{blue:02X}"),
        shares,
    }
}

fn parse_hex(hex: &str) -> [u8; 3] {
    let digits = hex.trim_start_matches('#');
    let channel = |start: usize| {
        digits
            .get(start..start + 2)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .unwrap_or_default()
    };
    [channel(0), channel(2), channel(4)]
}

fn family_index(family: ColorFamily) -> usize {
    match family {
        ColorFamily::Calm => 0,
        ColorFamily::Happy => 1,
        ColorFamily::Excited => 2,
        ColorFamily::Frustrated => 3,
        ColorFamily::Anxious => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::{ColorFamily, DEFAULT_COLOR, blend_daily_color, parse_hex};
    use crate::model::EmotionCode;
    use crate::model::fixtures::task;

    #[test]
    fn empty_input_is_neutral_gray() {
        let blend = blend_daily_color(&[]);

        assert_eq!(blend.hex, DEFAULT_COLOR);
        assert!(blend.shares.is_empty());
    }

    #[test]
    fn single_family_is_pure_color() {
        let tasks = vec![
            task("a", &[EmotionCode::EXCITED]),
            task("b", &[EmotionCode::ENERGIZED]),
            task("c", &[EmotionCode::INSPIRED]),
        ];
        let blend = blend_daily_color(&tasks);

        assert_eq!(blend.hex, ColorFamily::Excited.hex());
        assert_eq!(blend.shares.len(), 1);
        assert_eq!(blend.shares[0].proportion, 1.0);
    }

    #[test]
    fn only_primary_emotion_is_blended() {
        let tasks = vec![task("a", &[EmotionCode::CALM, EmotionCode::ANXIOUS])];

        assert_eq!(blend_daily_color(&tasks).hex, ColorFamily::Calm.hex());
    }

    #[test]
    fn two_families_average_channels() {
        let tasks = vec![
            task("a", &[EmotionCode::CALM]),
            task("b", &[EmotionCode::HAPPY]),
        ];
        let blend = blend_daily_color(&tasks);

        // (0x7E + 0xFF) / 2 = 190.5 -> 191, (0xC8 + 0xD1) / 2 = 204.5 -> 205, (0xE3 + 0x66) / 2 = 164.5 -> 165
        assert_eq!(blend.hex, "#BFCDA5");
    }

    #[test]
    fn family_follows_emotion_axis() {
        assert_eq!(ColorFamily::for_emotion(EmotionCode::TIRED), ColorFamily::Anxious);
        assert_eq!(ColorFamily::for_emotion(EmotionCode::PROUD), ColorFamily::Happy);
        assert_eq!(parse_hex("#FF8C42"), [255, 140, 66]);
    }
}
