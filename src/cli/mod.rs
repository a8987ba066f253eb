pub mod onboard;

use crate::analyzer::TimeRange;
use crate::model::EmotionCode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "moodlog", about = "Log your work, track how it felt, see the patterns")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Onboard,
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Log a task with one or more emotions.
    Log {
        description: String,
        #[arg(long, short)]
        project: Option<String>,
        #[arg(long = "type", short = 't', default_value = "general")]
        task_type: String,
        #[arg(long = "emotion", short, required = true, value_parser = parse_emotion)]
        emotions: Vec<EmotionCode>,
        #[arg(long, short)]
        notes: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Record how the day felt overall (0-100).
    Feeling {
        value: i64,
        #[arg(long)]
        date: Option<String>,
    },
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    Entries {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
    Insights {
        #[arg(long, default_value_t = TimeRange::Week, value_parser = parse_range)]
        range: TimeRange,
        #[arg(long)]
        date: Option<String>,
    },
    Report {
        #[arg(long, default_value_t = TimeRange::Week, value_parser = parse_range)]
        range: TimeRange,
        #[arg(long)]
        date: Option<String>,
    },
    Challenge {
        #[arg(long, default_value_t = TimeRange::Week, value_parser = parse_range)]
        range: TimeRange,
        #[arg(long)]
        date: Option<String>,
    },
    Export {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Replace all stored data with an export file.
    Import {
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    Doctor,
    /// Move tasks whose project no longer exists into "Recovered Projects".
    Recover {
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    Ai {
        #[command(subcommand)]
        command: AiCommands,
    },
    Serve,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommands {
    Add {
        name: String,
        #[arg(long)]
        color: Option<String>,
    },
    List,
    /// Remove a project (by id or name) together with its tasks.
    Remove { project: String },
}

#[derive(Debug, Subcommand)]
pub enum TaskCommands {
    Edit {
        id: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "type")]
        task_type: Option<String>,
        #[arg(long = "emotion", value_parser = parse_emotion)]
        emotions: Vec<EmotionCode>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        project: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum AiCommands {
    Test {
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
}

fn parse_emotion(raw: &str) -> Result<EmotionCode, String> {
    EmotionCode::from_label(raw).ok_or_else(|| {
        let labels = EmotionCode::all()
            .map(|code| code.label().to_lowercase())
            .collect::<Vec<_>>()
            .join(", ");
        format!("unknown emotion '{raw}'. Use 1-16 or one of: {labels}")
    })
}

fn parse_range(raw: &str) -> Result<TimeRange, String> {
    raw.parse::<TimeRange>().map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use crate::analyzer::TimeRange;
    use crate::model::EmotionCode;
    use clap::Parser;

    #[test]
    fn log_accepts_labels_and_codes() {
        let cli = Cli::try_parse_from([
            "moodlog", "log", "Homepage hero", "-e", "happy", "-e", "12", "--type", "design",
        ])
        .expect("parse log");

        match cli.command {
            Commands::Log {
                emotions, task_type, ..
            } => {
                assert_eq!(emotions, vec![EmotionCode::HAPPY, EmotionCode::FOCUSED]);
                assert_eq!(task_type, "design");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn log_requires_an_emotion() {
        assert!(Cli::try_parse_from(["moodlog", "log", "Homepage hero"]).is_err());
        assert!(Cli::try_parse_from(["moodlog", "log", "Hero", "-e", "ecstatic"]).is_err());
    }

    #[test]
    fn insights_range_defaults_to_week() {
        let cli = Cli::try_parse_from(["moodlog", "insights"]).expect("parse insights");
        assert!(matches!(
            cli.command,
            Commands::Insights {
                range: TimeRange::Week,
                ..
            }
        ));

        let cli = Cli::try_parse_from(["moodlog", "report", "--range", "year"]).expect("parse");
        assert!(matches!(
            cli.command,
            Commands::Report {
                range: TimeRange::Year,
                ..
            }
        ));
    }
}
