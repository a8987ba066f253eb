use crate::analyzer::TimeRange;
use crate::analyzer::categorizer::{EmotionBreakdown, EmotionBucket, emotion_frequencies};
use crate::model::{EmotionCode, Task};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeeklyInsightInput {
    pub task_count: usize,
    pub emotion_breakdown: EmotionBreakdown,
    pub time_range: TimeRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VolumeBand {
    Light,
    Steady,
    Busy,
    Intense,
    Marathon,
}

impl VolumeBand {
    fn of(task_count: usize) -> Option<Self> {
        match task_count {
            0 => None,
            1..=5 => Some(Self::Light),
            6..=15 => Some(Self::Steady),
            16..=30 => Some(Self::Busy),
            31..=50 => Some(Self::Intense),
            _ => Some(Self::Marathon),
        }
    }
}

/// Reflection sentence for a period.
///
/// The tone is positive when calm, happy and excited together outweigh
/// frustrated and anxious. Positive sentences never mention frustration.
pub fn generate_weekly_insights(input: &WeeklyInsightInput) -> String {
    let period = input.time_range.period_phrase();
    let range = input.time_range.noun();
    let count = input.task_count;

    let Some(band) = VolumeBand::of(count) else {
        return format!(
            "You haven't logged any tasks {period} yet. Add a few entries to start seeing your patterns."
        );
    };

    let tasks = plural(count, "task", "tasks");
    let positive = input.emotion_breakdown.is_positive();
    // name the strongest feeling that matches the tone
    let dominant = input.emotion_breakdown.dominant_with_tone(positive);

    if positive {
        match band {
            VolumeBand::Light => format!(
                "You logged {count} {tasks} {period}, and you felt mostly {dominant}. A small but encouraging start."
            ),
            VolumeBand::Steady => format!(
                "{count} {tasks} {period} with a steady rhythm. Feeling {dominant} was your most common state, a sign your work is landing well."
            ),
            VolumeBand::Busy => format!(
                "A productive {range} with {count} {tasks} logged! You felt mostly {dominant}, which suggests you found a good balance between effort and energy."
            ),
            VolumeBand::Intense => format!(
                "{count} {tasks} {period} is an impressive pace, and you stayed mostly {dominant} throughout. Protect the habits that made this {range} work."
            ),
            VolumeBand::Marathon => format!(
                "What a {range}: {count} {tasks} logged and you still felt mostly {dominant}. Remember to pace yourself so this energy lasts."
            ),
        }
    } else {
        match band {
            VolumeBand::Light => format!(
                "You logged {count} {tasks} {period}. There was some frustration along the way, so give yourself credit for showing up."
            ),
            VolumeBand::Steady => format!(
                "{count} {tasks} {period}, but frustration and stress came up often, with {dominant} leading the way. Give yourself credit for pushing through, and look for one thing to take off your plate."
            ),
            VolumeBand::Busy => format!(
                "A demanding {range} with {count} {tasks} logged. Frustration and worry were frequent companions, so give yourself credit for the volume and plan some recovery time."
            ),
            VolumeBand::Intense => format!(
                "{count} {tasks} {period} is a heavy load, and the frustration shows. Give yourself credit for carrying it, then consider what can be delegated or dropped."
            ),
            VolumeBand::Marathon => format!(
                "{count} {tasks} {period} is far beyond a sustainable pace, and frustration is building. Give yourself credit for the effort, and make rest a priority before next {range}."
            ),
        }
    }
}

/// One-line summary of a single day.
pub fn generate_daily_summary(tasks: &[Task], overall_feeling: Option<u8>) -> String {
    if tasks.is_empty() {
        return match overall_feeling {
            Some(value) => format!(
                "No tasks logged today, but it felt like {}.",
                feeling_phrase(value)
            ),
            None => "No tasks logged today. Take a moment to capture what you worked on.".to_string(),
        };
    }

    let count = tasks.len();
    let noun = plural(count, "task", "tasks");
    let mut summary = match emotion_frequencies(tasks).first() {
        Some((code, _)) => format!(
            "You completed {count} {noun} today, mostly feeling {} {}.",
            code.label().to_lowercase(),
            code.emoji()
        ),
        None => format!("You completed {count} {noun} today."),
    };

    if let Some(value) = overall_feeling {
        summary.push_str(&format!(" Overall it felt like {}.", feeling_phrase(value)));
    }

    summary
}

/// Insight for one emotion given how often it appeared.
pub fn generate_emotion_insight(code: EmotionCode, occurrences: usize, total_tasks: usize) -> String {
    let label = code.label();
    if total_tasks == 0 || occurrences == 0 {
        return format!("No tasks were tagged {label} yet.");
    }

    let percent = ((occurrences as f64 / total_tasks as f64) * 100.0).round() as u32;
    let lead = format!(
        "{label} showed up in {percent}% of your tasks ({occurrences} of {total_tasks})."
    );

    let advice = if EmotionBucket::Energizing.contains(code) {
        "Notice what these tasks have in common and plan more of them."
    } else if EmotionBucket::Meaningful.contains(code) {
        "These moments give your work meaning, so keep room for them in your week."
    } else if EmotionBucket::Curious.contains(code) {
        "Curiosity is a good signal for where to grow next."
    } else if EmotionBucket::Draining.contains(code) {
        "Look at what triggered it and whether those tasks can be batched, shortened or shared."
    } else {
        "Keep tracking to see how this feeling shifts over time."
    };

    format!("{lead} {advice}")
}

pub fn feeling_phrase(value: u8) -> &'static str {
    match value {
        80.. => "an excellent day",
        60..=79 => "a good day",
        40..=59 => "a balanced day",
        20..=39 => "a tough day",
        _ => "a really hard day",
    }
}

fn plural<'a>(count: usize, singular: &'a str, plural: &'a str) -> &'a str {
    if count == 1 { singular } else { plural }
}
