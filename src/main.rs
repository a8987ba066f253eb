mod ai;
mod analyzer;
mod api;
mod cli;
mod config;
mod db;
mod model;

use crate::ai::AiAssist;
use crate::analyzer::TimeRange;
use crate::analyzer::narrative::generate_daily_summary;
use crate::cli::onboard::run_onboarding;
use crate::cli::{AiCommands, Cli, Commands, ConfigCommands, ProjectCommands, TaskCommands};
use crate::config::{Config, parse_hhmm};
use crate::db::{Database, NewTask, TaskUpdate};
use crate::model::{EmotionCode, ExportDocument, Project, flatten_tasks};
use anyhow::{Context, Result, bail};
use chrono::{Duration, Local, NaiveDate};
use clap::Parser;
use dialoguer::Confirm;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Onboard => {
            let _ = run_onboarding()?;
            Ok(())
        }
        Commands::Config { command } => handle_config_command(command),
        Commands::Project { command } => handle_project_command(command),
        Commands::Log {
            description,
            project,
            task_type,
            emotions,
            notes,
            date,
        } => handle_log(description, project, task_type, emotions, notes, date),
        Commands::Feeling { value, date } => handle_feeling(value, date),
        Commands::Task { command } => handle_task_command(command),
        Commands::Entries { from, to } => handle_entries(from, to),
        Commands::Insights { range, date } => handle_insights(range, date),
        Commands::Report { range, date } => handle_report(range, date),
        Commands::Challenge { range, date } => handle_challenge(range, date),
        Commands::Export { output } => handle_export(output),
        Commands::Import { path, yes } => handle_import(&path, yes),
        Commands::Doctor => handle_doctor(),
        Commands::Recover { dry_run } => handle_recover(dry_run),
        Commands::Ai { command } => handle_ai_command(command),
        Commands::Serve => {
            let config = load_config()?;
            run_service(config).await
        }
    }
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            let masked = if key.contains("api_key") {
                "***hidden***".to_string()
            } else {
                value
            };
            println!("Config saved: {key} = {masked}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_project_command(command: ProjectCommands) -> Result<()> {
    let config = load_config()?;
    let database = Database::open(&config.db_path)?;

    match command {
        ProjectCommands::Add { name, color } => {
            let project = database.add_project(&name, color.as_deref())?;
            println!("Project added: {} ({})", project.name, project.id);
        }
        ProjectCommands::List => {
            let projects = database.load_projects()?;
            if projects.is_empty() {
                println!("No projects yet. Add one with `moodlog project add <name>`.");
            }

            let counts = task_counts_by_project(&database)?;
            for project in projects {
                println!(
                    "- {} [{}] {} ({} tasks)",
                    project.name,
                    project.id,
                    project.color,
                    counts.get(&project.id).copied().unwrap_or_default()
                );
            }
        }
        ProjectCommands::Remove { project } => {
            let target = resolve_project(&database, &project)?;
            let removed = database.delete_project(&target.id)?;
            println!("Project removed: {} ({removed} tasks deleted)", target.name);
        }
    }

    Ok(())
}

fn handle_log(
    description: String,
    project: Option<String>,
    task_type: String,
    emotions: Vec<EmotionCode>,
    notes: Option<String>,
    date: Option<String>,
) -> Result<()> {
    let config = load_config()?;
    let database = Database::open(&config.db_path)?;
    let target_date = parse_optional_date(date)?;

    let project = match project {
        Some(raw) => resolve_project(&database, &raw)?,
        None => default_project(&database)?,
    };

    let task = database.add_task(
        target_date,
        NewTask {
            project_id: project.id.clone(),
            description,
            task_type,
            emotions,
            notes,
        },
    )?;

    let feelings = task
        .emotions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    println!("Logged to {} on {target_date}: {}", project.name, task.description);
    println!("- feelings: {feelings}");
    println!("- id: {}", task.id);

    Ok(())
}

fn handle_feeling(value: i64, date: Option<String>) -> Result<()> {
    let config = load_config()?;
    let database = Database::open(&config.db_path)?;
    let target_date = parse_optional_date(date)?;

    let entry = database.set_overall_feeling(target_date, value)?;
    println!(
        "Overall feeling for {} set to {}/100",
        entry.date,
        entry.overall_feeling.unwrap_or_default()
    );

    Ok(())
}

fn handle_task_command(command: TaskCommands) -> Result<()> {
    let config = load_config()?;
    let database = Database::open(&config.db_path)?;

    match command {
        TaskCommands::Edit {
            id,
            description,
            task_type,
            emotions,
            notes,
            project,
        } => {
            let project_id = project
                .map(|raw| resolve_project(&database, &raw).map(|project| project.id))
                .transpose()?;

            let task = database.update_task(
                &id,
                TaskUpdate {
                    project_id,
                    description,
                    task_type,
                    emotions: (!emotions.is_empty()).then_some(emotions),
                    notes,
                },
            )?;
            println!("Task updated: {}", task.description);
        }
        TaskCommands::Delete { id } => {
            database.delete_task(&id)?;
            println!("Task deleted: {id}");
        }
    }

    Ok(())
}

fn handle_entries(from: Option<String>, to: Option<String>) -> Result<()> {
    let config = load_config()?;
    let database = Database::open(&config.db_path)?;

    let to_date = parse_optional_date(to)?;
    let from_date = match from {
        Some(raw) => parse_date(&raw)?,
        None => to_date - Duration::days(6),
    };

    let project_names = database
        .load_projects()?
        .into_iter()
        .map(|project| (project.id, project.name))
        .collect::<HashMap<_, _>>();

    let entries = database.entries_between(from_date, to_date)?;
    if entries.is_empty() {
        println!("No entries between {from_date} and {to_date}.");
        return Ok(());
    }

    for entry in entries {
        println!("\n{}", entry.date.format("%A, %Y-%m-%d"));
        println!("  {}", generate_daily_summary(&entry.tasks, entry.overall_feeling));
        for task in &entry.tasks {
            let feelings = task
                .emotions
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "  - [{}] {} ({}) {feelings}",
                project_names
                    .get(&task.project_id)
                    .map(String::as_str)
                    .unwrap_or("Unknown project"),
                task.description,
                task.task_type
            );
            if let Some(notes) = &task.notes {
                println!("      {notes}");
            }
        }
    }

    Ok(())
}

fn handle_insights(range: TimeRange, date: Option<String>) -> Result<()> {
    let config = load_config()?;
    let database = Database::open(&config.db_path)?;
    let today = parse_optional_date(date)?;
    let assist = AiAssist::from_config(&config);

    let report = analyzer::build_report(&database, range, today, assist.as_ref())?;

    println!("Insights for the last {range} ({} to {})", report.from, report.to);
    println!("- tasks: {} across {} days", report.task_count, report.entry_count);
    if let Some(average) = report.average_feeling {
        println!("- average overall feeling: {average:.1}/100");
    }
    println!("- daily color: {}", report.color.hex);
    println!("- themes: {}", report.summary_tags.join(", "));
    println!("\n{}", report.weekly_insight);

    if !report.emotion_insights.is_empty() {
        println!("\nTop emotions");
        for insight in &report.emotion_insights {
            println!("- {} {}", insight.emoji, insight.text);
        }
    }

    Ok(())
}

fn handle_report(range: TimeRange, date: Option<String>) -> Result<()> {
    let config = load_config()?;
    let today = parse_optional_date(date)?;
    let assist = AiAssist::from_config(&config);

    let (report, saved) =
        analyzer::generate_and_store_report(&config, range, today, assist.as_ref())?;

    println!("Report generated: {} ({} to {})", report.range, report.from, report.to);
    println!("- Markdown: {}", saved.markdown_path.display());
    println!("- JSON: {}", saved.json_path.display());

    Ok(())
}

fn handle_challenge(range: TimeRange, date: Option<String>) -> Result<()> {
    let config = load_config()?;
    let database = Database::open(&config.db_path)?;
    let (from, to) = range.window(parse_optional_date(date)?);
    let assist = AiAssist::from_config(&config);

    let entries = database.entries_between(from, to)?;
    let tasks = flatten_tasks(&entries);
    let recommendation = analyzer::challenges(&tasks, assist.as_ref());

    println!("{}", recommendation.reason);
    for template in &recommendation.challenges {
        println!("\n## {}", template.title);
        println!("{}", template.summary);
        for action in template.actions {
            println!("- {action}");
        }
    }

    Ok(())
}

fn handle_export(output: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let database = Database::open(&config.db_path)?;
    let document = database.export_data()?;
    let content =
        serde_json::to_string_pretty(&document).context("Failed to serialize export")?;

    match output {
        Some(path) => {
            fs::write(&path, content)
                .with_context(|| format!("Failed to write export file: {}", path.display()))?;
            println!(
                "Exported {} entries and {} projects to {}",
                document.entries.len(),
                document.projects.len(),
                path.display()
            );
        }
        None => println!("{content}"),
    }

    Ok(())
}

fn handle_import(path: &Path, yes: bool) -> Result<()> {
    let config = load_config()?;
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file: {}", path.display()))?;
    let document: ExportDocument = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse import file: {}", path.display()))?;

    let confirmed = yes
        || Confirm::new()
            .with_prompt("Importing replaces all entries, projects and your profile. Continue?")
            .default(false)
            .interact()
            .context("Failed to read import confirmation")?;
    if !confirmed {
        println!("Import cancelled");
        return Ok(());
    }

    let database = Database::open(&config.db_path)?;
    let summary = database.import_data(document)?;
    println!(
        "Imported {} entries, {} tasks, {} projects",
        summary.entries, summary.tasks, summary.projects
    );
    if summary.recovered_tasks > 0 {
        println!(
            "- {} tasks pointed at missing projects and were moved to {}",
            summary.recovered_tasks,
            db::RECOVERED_PROJECT_NAME
        );
    }

    Ok(())
}

fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path()?;
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing".to_string());
    }

    let config = load_or_default_config()?;

    match Database::open(&config.db_path) {
        Ok(database) => {
            println!("[OK] SQLite reachable: {}", config.db_path.display());

            if database.onboarding_complete()? {
                println!("[OK] onboarding complete");
            } else {
                println!("[WARN] onboarding not complete. Run `moodlog onboard`");
                issues.push("onboarding incomplete".to_string());
            }

            let orphans = database.find_orphaned_tasks()?;
            if orphans.is_empty() {
                println!("[OK] every task belongs to a project");
            } else {
                println!(
                    "[WARN] {} tasks reference missing projects. Run `moodlog recover`",
                    orphans.len()
                );
                issues.push("orphaned tasks".to_string());
            }

            let settings = database.load_settings()?;
            if let Err(error) = parse_hhmm(&settings.reminder_time) {
                println!("[WARN] invalid reminder time: {error}");
                issues.push("invalid reminder time".to_string());
            }
        }
        Err(error) => {
            println!("[WARN] SQLite check failed: {error}");
            issues.push("db unreachable".to_string());
        }
    }

    if config.report_dir.exists() {
        println!("[OK] report dir exists: {}", config.report_dir.display());
    } else {
        println!("[WARN] report dir missing: {}", config.report_dir.display());
        issues.push("report dir missing".to_string());
    }

    if config.ai_enabled {
        if ai::has_api_key(&config) {
            println!("[OK] AI API key is configured");
        } else {
            println!("[WARN] AI is enabled but API key is missing (pattern-based insights only)");
            issues.push("ai api key missing".to_string());
        }
    } else {
        println!("[OK] AI feature disabled");
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

fn handle_recover(dry_run: bool) -> Result<()> {
    let config = load_config()?;
    let database = Database::open(&config.db_path)?;

    if dry_run {
        let orphans = database.find_orphaned_tasks()?;
        if orphans.is_empty() {
            println!("No orphaned tasks found");
        }
        for orphan in orphans {
            println!(
                "- {} {} (missing project {})",
                orphan.date, orphan.description, orphan.project_id
            );
        }
        return Ok(());
    }

    let moved = database.recover_orphaned_tasks()?;
    if moved == 0 {
        println!("No orphaned tasks found");
    } else {
        println!("Moved {moved} tasks to {}", db::RECOVERED_PROJECT_NAME);
    }

    Ok(())
}

fn handle_ai_command(command: AiCommands) -> Result<()> {
    match command {
        AiCommands::Test {
            key,
            base_url,
            model,
        } => {
            let mut config = load_or_default_config()?;

            if let Some(value) = key {
                config.ai_api_key = Some(value);
            }
            if let Some(value) = base_url {
                config.ai_api_base_url = value;
            }
            if let Some(value) = model {
                config.ai_model = value;
            }

            let response = ai::test_connection(&config)?;
            println!("AI API connection successful");
            println!("{response}");

            Ok(())
        }
    }
}

async fn run_service(config: Config) -> Result<()> {
    config.ensure_bootstrap_files()?;
    let _ = Database::open(&config.db_path)?;

    let shared_config = Arc::new(config);
    info!("moodlog service started");

    tokio::select! {
        api_result = api::run_server(shared_config) => {
            api_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

fn resolve_project(database: &Database, raw: &str) -> Result<Project> {
    database.find_project(raw)?.with_context(|| {
        format!("Project not found: {raw}. Create it with `moodlog project add \"{raw}\"`")
    })
}

/// Settings' default project, else the only project there is.
fn default_project(database: &Database) -> Result<Project> {
    let settings = database.load_settings()?;
    if let Some(project) = settings
        .default_project_id
        .as_deref()
        .map(|id| database.find_project(id))
        .transpose()?
        .flatten()
    {
        return Ok(project);
    }

    let mut projects = database.load_projects()?;
    match projects.len() {
        0 => bail!("No projects yet. Run `moodlog onboard` or `moodlog project add <name>`"),
        1 => Ok(projects.remove(0)),
        _ => bail!("Several projects exist. Pick one with --project <name>"),
    }
}

fn task_counts_by_project(database: &Database) -> Result<HashMap<String, usize>> {
    let entries = database.load_entries()?;
    Ok(flatten_tasks(&entries)
        .into_iter()
        .fold(HashMap::new(), |mut acc, task| {
            *acc.entry(task.project_id.clone()).or_insert(0) += 1;
            acc
        }))
}

fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format: {input}. Example: 2026-02-18"))
}

fn parse_optional_date(input: Option<String>) -> Result<NaiveDate> {
    Ok(input
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or_else(|| Local::now().date_naive()))
}

fn load_or_default_config() -> Result<Config> {
    Config::load().or_else(|_| {
        let config = Config::default();
        config.ensure_bootstrap_files()?;
        config.save()?;
        Ok(config)
    })
}

fn load_config() -> Result<Config> {
    Config::load()
        .with_context(|| "Config file not found. Run `moodlog onboard` first.".to_string())
}
