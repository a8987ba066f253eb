use crate::analyzer::categorizer::{
    BucketCounts, EmotionAxis, EmotionBreakdown, categorize_tasks, emotion_breakdown,
    emotion_frequencies,
};
use crate::analyzer::color::{ColorBlend, DEFAULT_COLOR, blend_daily_color};
use crate::analyzer::keywords::tags_are_meaningful;
use crate::analyzer::narrative::generate_emotion_insight;
use crate::analyzer::{InsightSource, TimeRange, WeeklyInsight};
use crate::model::{EmotionCode, Entry, Project, flatten_tasks};
use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const TOP_EMOTIONS: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionInsight {
    pub code: EmotionCode,
    pub label: String,
    pub emoji: String,
    pub occurrences: usize,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCount {
    pub project_id: String,
    pub name: String,
    pub task_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub glyph: Option<String>,
    pub color: String,
    pub task_count: usize,
    pub overall_feeling: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightReport {
    pub range: TimeRange,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub generated_at: String,
    pub entry_count: usize,
    pub task_count: usize,
    pub average_feeling: Option<f64>,
    pub emotion_breakdown: EmotionBreakdown,
    pub bucket_counts: BucketCounts,
    pub color: ColorBlend,
    pub summary_tags: Vec<String>,
    pub tags_meaningful: bool,
    pub weekly_insight: String,
    pub insight_source: InsightSource,
    pub emotion_insights: Vec<EmotionInsight>,
    pub projects: Vec<ProjectCount>,
    pub calendar: Vec<CalendarCell>,
}

/// Text parts that may come from the AI service.
#[derive(Debug, Clone)]
pub struct ReportNarrative {
    pub weekly_insight: WeeklyInsight,
    pub summary_tags: Vec<String>,
}

#[derive(Debug)]
pub struct SavedReport {
    pub markdown_path: PathBuf,
    pub json_path: PathBuf,
}

pub fn build_insight_report(
    range: TimeRange,
    from: NaiveDate,
    to: NaiveDate,
    entries: &[Entry],
    projects: &[Project],
    narrative: ReportNarrative,
) -> InsightReport {
    let entries = entries
        .iter()
        .filter(|entry| entry.date >= from && entry.date <= to)
        .collect::<Vec<_>>();
    let tasks = entries
        .iter()
        .flat_map(|entry| entry.tasks.iter())
        .collect::<Vec<_>>();

    let feelings = entries
        .iter()
        .filter_map(|entry| entry.overall_feeling)
        .collect::<Vec<_>>();
    let average_feeling = (!feelings.is_empty()).then(|| {
        let sum = feelings.iter().map(|value| f64::from(*value)).sum::<f64>();
        (sum / feelings.len() as f64 * 10.0).round() / 10.0
    });

    let emotion_insights = emotion_frequencies(tasks.iter().copied())
        .into_iter()
        .take(TOP_EMOTIONS)
        .map(|(code, occurrences)| EmotionInsight {
            code,
            label: code.label().to_string(),
            emoji: code.emoji().to_string(),
            occurrences,
            text: generate_emotion_insight(code, occurrences, tasks.len()),
        })
        .collect::<Vec<_>>();

    let project_names = projects
        .iter()
        .map(|project| (project.id.as_str(), project.name.as_str()))
        .collect::<HashMap<_, _>>();
    let project_counts = tasks.iter().fold(HashMap::new(), |mut acc, task| {
        *acc.entry(task.project_id.as_str()).or_insert(0_usize) += 1;
        acc
    });
    let mut project_rows = project_counts
        .into_iter()
        .map(|(project_id, task_count)| ProjectCount {
            project_id: project_id.to_string(),
            name: project_names
                .get(project_id)
                .map(|name| name.to_string())
                .unwrap_or_else(|| "Unknown project".to_string()),
            task_count,
        })
        .collect::<Vec<_>>();
    project_rows.sort_by(|left, right| {
        right
            .task_count
            .cmp(&left.task_count)
            .then_with(|| left.name.cmp(&right.name))
    });

    let tags_meaningful = tags_are_meaningful(&narrative.summary_tags);

    InsightReport {
        range,
        from,
        to,
        generated_at: Utc::now().to_rfc3339(),
        entry_count: entries.len(),
        task_count: tasks.len(),
        average_feeling,
        emotion_breakdown: emotion_breakdown(tasks.iter().copied()),
        bucket_counts: categorize_tasks(tasks.iter().copied()).counts(),
        color: blend_daily_color(tasks.iter().copied()),
        summary_tags: narrative.summary_tags,
        tags_meaningful,
        weekly_insight: narrative.weekly_insight.text,
        insight_source: narrative.weekly_insight.source,
        emotion_insights,
        projects: project_rows,
        calendar: calendar_cells(from, to, &entries),
    }
}

/// One cell per day in `from..=to`.
pub fn calendar_cells(from: NaiveDate, to: NaiveDate, entries: &[&Entry]) -> Vec<CalendarCell> {
    let by_date = entries
        .iter()
        .map(|entry| (entry.date, *entry))
        .collect::<HashMap<_, _>>();

    let mut cells = Vec::new();
    let mut day = from;
    while day <= to {
        let cell = match by_date.get(&day) {
            Some(entry) => CalendarCell {
                date: day,
                glyph: day_glyph(entry),
                color: blend_daily_color(entry.tasks.iter()).hex,
                task_count: entry.tasks.len(),
                overall_feeling: entry.overall_feeling,
            },
            None => CalendarCell {
                date: day,
                glyph: None,
                color: DEFAULT_COLOR.to_string(),
                task_count: 0,
                overall_feeling: None,
            },
        };
        cells.push(cell);
        day += Duration::days(1);
    }

    cells
}

/// The overall feeling wins over the day's most frequent emotion.
pub fn day_glyph(entry: &Entry) -> Option<String> {
    if let Some(value) = entry.overall_feeling {
        return Some(feeling_glyph(value).to_string());
    }

    emotion_frequencies(entry.tasks.iter())
        .first()
        .map(|(code, _)| code.emoji().to_string())
}

pub fn feeling_glyph(value: u8) -> &'static str {
    match value {
        80.. => "😄",
        60..=79 => "🙂",
        40..=59 => "😐",
        20..=39 => "😕",
        _ => "😞",
    }
}

pub fn render_markdown(report: &InsightReport) -> String {
    let average_feeling = report
        .average_feeling
        .map(|value| format!("{value:.1}/100"))
        .unwrap_or_else(|| "Not recorded".to_string());

    let axis_rows = EmotionAxis::ALL
        .iter()
        .map(|axis| {
            format!(
                "| {} | {} |",
                axis.label(),
                format_percent(report.emotion_breakdown.get(*axis))
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let color_rows = if report.color.shares.is_empty() {
        "- No data".to_string()
    } else {
        report
            .color
            .shares
            .iter()
            .map(|share| {
                format!(
                    "- {:?} {} ({})",
                    share.family,
                    share.hex,
                    format_percent(share.proportion)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let tag_rows = report
        .summary_tags
        .iter()
        .map(|tag| format!("- {tag}"))
        .collect::<Vec<_>>()
        .join("\n");

    let emotion_rows = if report.emotion_insights.is_empty() {
        "- No emotions logged".to_string()
    } else {
        report
            .emotion_insights
            .iter()
            .enumerate()
            .map(|(index, insight)| {
                format!("{}. {} {}: {}", index + 1, insight.emoji, insight.label, insight.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let project_rows = if report.projects.is_empty() {
        "- No data".to_string()
    } else {
        report
            .projects
            .iter()
            .map(|project| format!("| {} | {} |", project.name, project.task_count))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let day_rows = report
        .calendar
        .iter()
        .filter(|cell| cell.glyph.is_some())
        .map(|cell| {
            format!(
                "- {} {} {} ({})",
                cell.date.format("%Y-%m-%d"),
                cell.glyph.as_deref().unwrap_or_default(),
                cell.color,
                plural_tasks(cell.task_count)
            )
        })
        .collect::<Vec<_>>();
    let day_rows = if day_rows.is_empty() {
        "- No days logged".to_string()
    } else {
        day_rows.join("\n")
    };

    let source = match report.insight_source {
        InsightSource::Ai => "AI",
        InsightSource::RuleBased => "pattern-based",
    };

    format!(
        "# Mood Report ({}) - {} to {}\n\n## Summary\n- Days logged: {}\n- Tasks logged: {}\n- Average overall feeling: {}\n- Daily color: {}\n- Energizing / draining / meaningful / curious tasks: {} / {} / {} / {}\n\n## Insight\n{}\n\n_Source: {}_\n\n## Feelings\n| Feeling | Share |\n|---------|-------|\n{}\n\n## Color Blend\n{}\n\n## Themes\n{}\n\n## Top Emotions\n{}\n\n## Projects\n| Project | Tasks |\n|---------|-------|\n{}\n\n## Calendar\n{}\n",
        report.range,
        report.from.format("%Y-%m-%d"),
        report.to.format("%Y-%m-%d"),
        report.entry_count,
        report.task_count,
        average_feeling,
        report.color.hex,
        report.bucket_counts.energizing,
        report.bucket_counts.draining,
        report.bucket_counts.meaningful,
        report.bucket_counts.curious,
        report.weekly_insight,
        source,
        axis_rows,
        color_rows,
        tag_rows,
        emotion_rows,
        project_rows,
        day_rows
    )
}

pub fn save_report_files(report: &InsightReport, report_dir: &Path) -> Result<SavedReport> {
    fs::create_dir_all(report_dir).with_context(|| {
        format!(
            "Failed to create report directory: {}",
            report_dir.display()
        )
    })?;

    let stem = format!("{}-{}", report.range, report.to.format("%Y-%m-%d"));
    let markdown_path = report_dir.join(format!("{stem}.md"));
    let json_path = report_dir.join(format!("{stem}.json"));

    fs::write(&markdown_path, render_markdown(report)).with_context(|| {
        format!(
            "Failed to write Markdown report: {}",
            markdown_path.display()
        )
    })?;

    let json_content =
        serde_json::to_string_pretty(report).context("Failed to serialize report JSON")?;
    fs::write(&json_path, json_content)
        .with_context(|| format!("Failed to write JSON report: {}", json_path.display()))?;

    Ok(SavedReport {
        markdown_path,
        json_path,
    })
}

/// Task count over every entry, used by the status endpoint.
pub fn total_tasks(entries: &[Entry]) -> usize {
    flatten_tasks(entries).len()
}

fn format_percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

fn plural_tasks(count: usize) -> String {
    if count == 1 {
        "1 task".to_string()
    } else {
        format!("{count} tasks")
    }
}

#[cfg(test)]
mod tests {
    use super::{ReportNarrative, build_insight_report, day_glyph, render_markdown, save_report_files};
    use crate::analyzer::color::DEFAULT_COLOR;
    use crate::analyzer::{InsightSource, TimeRange, WeeklyInsight};
    use crate::model::fixtures::{entry, task};
    use crate::model::{EmotionCode, Project};
    use chrono::{NaiveDate, Utc};

    fn narrative() -> ReportNarrative {
        ReportNarrative {
            weekly_insight: WeeklyInsight {
                text: "A calm week.".to_string(),
                source: InsightSource::RuleBased,
            },
            summary_tags: vec![
                "Design tasks".to_string(),
                "Wireframes".to_string(),
                "Meetings".to_string(),
            ],
        }
    }

    fn project() -> Project {
        Project {
            id: "project-1".to_string(),
            name: "Website".to_string(),
            color: "#7EC8E3".to_string(),
            created_at: Utc::now(),
        }
    }

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid date")
    }

    #[test]
    fn report_covers_every_day_in_window() {
        let mut felt = entry("2024-03-05", vec![task("Review", &[EmotionCode::TIRED])]);
        felt.overall_feeling = Some(85);
        let entries = vec![
            entry(
                "2024-03-04",
                vec![
                    task("Wireframes", &[EmotionCode::CALM]),
                    task("Sketches", &[EmotionCode::CALM, EmotionCode::HAPPY]),
                ],
            ),
            felt,
            entry("2024-02-01", vec![task("Outside", &[EmotionCode::SAD])]),
        ];

        let report = build_insight_report(
            TimeRange::Week,
            date("2024-03-04"),
            date("2024-03-10"),
            &entries,
            &[project()],
            narrative(),
        );

        assert_eq!(report.entry_count, 2);
        assert_eq!(report.task_count, 3);
        assert_eq!(report.average_feeling, Some(85.0));
        assert_eq!(report.calendar.len(), 7);
        assert_eq!(report.calendar[0].glyph.as_deref(), Some(EmotionCode::CALM.emoji()));
        assert_eq!(report.calendar[1].glyph.as_deref(), Some("😄"));
        assert_eq!(report.calendar[2].glyph, None);
        assert_eq!(report.calendar[2].color, DEFAULT_COLOR);
        assert_eq!(report.emotion_insights[0].code, EmotionCode::CALM);
        assert_eq!(report.projects[0].name, "Website");
        assert_eq!(report.projects[0].task_count, 3);
        assert!(report.tags_meaningful);
    }

    #[test]
    fn glyph_falls_back_to_dominant_emotion() {
        let day = entry(
            "2024-03-04",
            vec![
                task("Standup", &[EmotionCode::BORED]),
                task("Retro", &[EmotionCode::BORED, EmotionCode::CURIOUS]),
            ],
        );

        assert_eq!(day_glyph(&day).as_deref(), Some(EmotionCode::BORED.emoji()));
        assert_eq!(day_glyph(&entry("2024-03-04", Vec::new())), None);
    }

    #[test]
    fn markdown_and_json_are_saved_by_range_and_date() {
        let dir = tempfile::tempdir().expect("tempdir");
        let entries = vec![entry("2024-03-04", vec![task("Wireframes", &[EmotionCode::CALM])])];
        let report = build_insight_report(
            TimeRange::Month,
            date("2024-02-10"),
            date("2024-03-10"),
            &entries,
            &[project()],
            narrative(),
        );

        let markdown = render_markdown(&report);
        assert!(markdown.starts_with("# Mood Report (month) - 2024-02-10 to 2024-03-10"));
        assert!(markdown.contains("| Calm | 100% |"));
        assert!(markdown.contains("A calm week."));

        let saved = save_report_files(&report, dir.path()).expect("save report");
        assert!(saved.markdown_path.ends_with("month-2024-03-10.md"));
        let json: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(&saved.json_path).expect("read json"),
        )
        .expect("parse json");
        assert_eq!(json["range"], "month");
        assert_eq!(json["insightSource"], "rule_based");
        assert_eq!(json["calendar"].as_array().map(Vec::len), Some(30));
    }
}
