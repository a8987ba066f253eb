pub mod categorizer;
pub mod challenge;
pub mod color;
pub mod keywords;
pub mod narrative;
pub mod report;

use crate::ai::AiAssist;
use crate::analyzer::categorizer::{EmotionBreakdown, emotion_breakdown};
use crate::analyzer::challenge::{ChallengeRecommendation, recommend_challenge};
use crate::analyzer::keywords::{TAG_COUNT, generate_summary_tags};
use crate::analyzer::narrative::{WeeklyInsightInput, generate_weekly_insights};
use crate::analyzer::report::{InsightReport, ReportNarrative, SavedReport};
use crate::config::Config;
use crate::db::Database;
use crate::model::{Task, flatten_tasks};
use anyhow::{Result, bail};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    #[default]
    Week,
    Month,
    Year,
}

impl TimeRange {
    pub fn days(self) -> i64 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Year => 365,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    pub fn noun(self) -> &'static str {
        self.as_str()
    }

    pub fn period_phrase(self) -> &'static str {
        match self {
            Self::Week => "this week",
            Self::Month => "this month",
            Self::Year => "this year",
        }
    }

    /// Rolling window ending on, and including, `today`.
    pub fn window(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        (today - Duration::days(self.days() - 1), today)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "week" | "weekly" | "7d" => Ok(Self::Week),
            "month" | "monthly" | "30d" => Ok(Self::Month),
            "year" | "yearly" | "365d" => Ok(Self::Year),
            _ => bail!("Unsupported time range: {raw}. Use week|month|year"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightSource {
    Ai,
    RuleBased,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyInsight {
    pub text: String,
    pub source: InsightSource,
}

/// Reflection text for a period, preferring the AI service and falling back
/// to the rule-based narrative on failure or when the service declines.
pub fn weekly_insight(
    tasks: &[&Task],
    breakdown: &EmotionBreakdown,
    time_range: TimeRange,
    assist: Option<&AiAssist>,
) -> WeeklyInsight {
    if !tasks.is_empty() {
        if let Some(assist) = assist {
            match assist.weekly_insight(tasks, breakdown, time_range) {
                Ok(Some(text)) => {
                    return WeeklyInsight {
                        text,
                        source: InsightSource::Ai,
                    };
                }
                Ok(None) => debug!("AI requested the rule-based insight"),
                Err(error) => warn!(error = %error, "AI insight failed; using rule-based insight"),
            }
        }
    }

    WeeklyInsight {
        text: generate_weekly_insights(&WeeklyInsightInput {
            task_count: tasks.len(),
            emotion_breakdown: *breakdown,
            time_range,
        }),
        source: InsightSource::RuleBased,
    }
}

/// Exactly three tags. AI keywords come first and local tags fill the rest.
pub fn summary_tags(tasks: &[&Task], time_range: TimeRange, assist: Option<&AiAssist>) -> Vec<String> {
    let local = generate_summary_tags(tasks.iter().copied());

    let remote = match assist.filter(|_| !tasks.is_empty()) {
        Some(assist) => match assist.summary_keywords(tasks, time_range) {
            Ok(keywords) => keywords.unwrap_or_default(),
            Err(error) => {
                warn!(error = %error, "AI keywords failed; using local tags");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let mut tags: Vec<String> = Vec::with_capacity(TAG_COUNT);
    for tag in remote.into_iter().chain(local) {
        if tags.len() == TAG_COUNT {
            break;
        }
        if !tags.iter().any(|existing| existing.eq_ignore_ascii_case(&tag)) {
            tags.push(tag);
        }
    }

    tags
}

/// Challenge recommendation with AI scores in front of the local chain.
pub fn challenges(tasks: &[&Task], assist: Option<&AiAssist>) -> ChallengeRecommendation {
    let external = match assist.filter(|_| !tasks.is_empty()) {
        Some(assist) => assist.challenge_scores(tasks).unwrap_or_else(|error| {
            warn!(error = %error, "AI challenge matching failed; using local matcher");
            None
        }),
        None => None,
    };

    recommend_challenge(tasks, external.as_deref())
}

pub fn build_report(
    database: &Database,
    time_range: TimeRange,
    today: NaiveDate,
    assist: Option<&AiAssist>,
) -> Result<InsightReport> {
    let (from, to) = time_range.window(today);
    let entries = database.entries_between(from, to)?;
    let projects = database.load_projects()?;

    let tasks = flatten_tasks(&entries);
    let breakdown = emotion_breakdown(tasks.iter().copied());
    let narrative = ReportNarrative {
        weekly_insight: weekly_insight(&tasks, &breakdown, time_range, assist),
        summary_tags: summary_tags(&tasks, time_range, assist),
    };

    Ok(report::build_insight_report(
        time_range, from, to, &entries, &projects, narrative,
    ))
}

pub fn generate_and_store_report(
    config: &Config,
    time_range: TimeRange,
    today: NaiveDate,
    assist: Option<&AiAssist>,
) -> Result<(InsightReport, SavedReport)> {
    let database = Database::open(&config.db_path)?;
    let report = build_report(&database, time_range, today, assist)?;
    let saved = report::save_report_files(&report, &config.report_dir)?;

    Ok((report, saved))
}

#[cfg(test)]
mod tests {
    use super::{InsightSource, TimeRange, challenges, summary_tags, weekly_insight};
    use crate::ai::AiAssist;
    use crate::ai::cache::ResponseCache;
    use crate::ai::testing::FakeGenerator;
    use crate::analyzer::categorizer::emotion_breakdown;
    use crate::analyzer::challenge::ChallengeSource;
    use crate::model::fixtures::task;
    use crate::model::{EmotionCode, Task};
    use chrono::NaiveDate;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn assist(generator: Arc<FakeGenerator>) -> AiAssist {
        AiAssist::new(Box::new(generator), ResponseCache::new(Duration::from_secs(60)))
    }

    #[test]
    fn windows_are_rolling_and_inclusive() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).expect("date");

        assert_eq!(
            TimeRange::Week.window(today),
            (NaiveDate::from_ymd_opt(2024, 3, 4).expect("date"), today)
        );
        assert_eq!(
            TimeRange::Month.window(today).0,
            NaiveDate::from_ymd_opt(2024, 2, 10).expect("date")
        );
        assert_eq!("Monthly".parse::<TimeRange>().expect("range"), TimeRange::Month);
        assert!("decade".parse::<TimeRange>().is_err());
    }

    #[test]
    fn failing_ai_falls_back_to_rules() {
        let generator = Arc::new(FakeGenerator::failing());
        let assist = assist(Arc::clone(&generator));
        let tasks = vec![task("Wireframes", &[EmotionCode::CALM])];
        let refs = tasks.iter().collect::<Vec<_>>();
        let breakdown = emotion_breakdown(refs.iter().copied());

        let insight = weekly_insight(&refs, &breakdown, TimeRange::Week, Some(&assist));
        assert_eq!(insight.source, InsightSource::RuleBased);
        assert!(insight.text.contains("this week"));

        let recommendation = challenges(&refs, Some(&assist));
        assert_ne!(recommendation.source, ChallengeSource::Ai);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn ai_insight_is_used_when_available() {
        let assist = assist(Arc::new(FakeGenerator::replying(
            r#"{"insight":"You found your flow."}"#,
        )));
        let tasks = vec![task("Wireframes", &[EmotionCode::FOCUSED])];
        let refs = tasks.iter().collect::<Vec<_>>();
        let breakdown = emotion_breakdown(refs.iter().copied());

        let insight = weekly_insight(&refs, &breakdown, TimeRange::Week, Some(&assist));
        assert_eq!(insight.source, InsightSource::Ai);
        assert_eq!(insight.text, "You found your flow.");
    }

    #[test]
    fn empty_period_skips_ai() {
        let generator = Arc::new(FakeGenerator::replying(r#"{"insight":"unused"}"#));
        let assist = assist(Arc::clone(&generator));
        let breakdown = emotion_breakdown(std::iter::empty());

        let insight = weekly_insight(&[], &breakdown, TimeRange::Month, Some(&assist));
        assert_eq!(insight.source, InsightSource::RuleBased);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    fn negative_week() -> Vec<Task> {
        vec![
            task("Homepage", &[EmotionCode::ANNOYED]),
            task("Icons", &[EmotionCode::ANNOYED, EmotionCode::SAD]),
            task("Footer", &[EmotionCode::ANXIOUS]),
        ]
    }

    #[test]
    fn rule_based_flag_skips_ai_challenges() {
        let generator = Arc::new(FakeGenerator::replying(r#"{"useRuleBased":true}"#));
        let assist = assist(Arc::clone(&generator));
        let tasks = negative_week();
        let refs = tasks.iter().collect::<Vec<_>>();

        let recommendation = challenges(&refs, Some(&assist));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(recommendation.source, ChallengeSource::EmotionPattern);
        assert_eq!(recommendation.challenges[0].id, "creative-block");
    }

    #[test]
    fn low_confidence_ai_match_falls_through() {
        let assist = assist(Arc::new(FakeGenerator::replying(
            r#"{"matches":[{"id":"stress","confidence":40}]}"#,
        )));
        let tasks = negative_week();
        let refs = tasks.iter().collect::<Vec<_>>();

        let recommendation = challenges(&refs, Some(&assist));
        assert_ne!(recommendation.source, ChallengeSource::Ai);
        assert_eq!(recommendation.challenges[0].id, "creative-block");

        let calm = vec![task("Icons", &[EmotionCode::HAPPY])];
        let refs = calm.iter().collect::<Vec<_>>();
        assert_eq!(
            challenges(&refs, Some(&assist)).source,
            ChallengeSource::Default
        );
    }

    #[test]
    fn ai_keywords_are_padded_with_local_tags() {
        let assist = assist(Arc::new(FakeGenerator::replying(
            r#"{"keywords":["Brand Refresh"]}"#,
        )));
        let tasks = vec![
            task("Homepage wireframes", &[EmotionCode::CALM]),
            task("Sprint review meeting", &[EmotionCode::TIRED]),
        ];
        let refs = tasks.iter().collect::<Vec<_>>();

        let tags = summary_tags(&refs, TimeRange::Week, Some(&assist));
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0], "Brand Refresh");
    }
}
