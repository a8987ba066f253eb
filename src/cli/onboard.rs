use crate::config::{Config, default_report_dir, expand_home, parse_hhmm};
use crate::db::Database;
use crate::model::{Settings, UserProfile};
use anyhow::{Context, Result};
use chrono::Utc;
use dialoguer::{Confirm, Input, MultiSelect, Select, theme::ColorfulTheme};

const ROLES: [&str; 6] = [
    "Product designer",
    "UX designer",
    "UI designer",
    "Design lead",
    "Researcher",
    "Other",
];

const FOCUS_AREAS: [&str; 6] = [
    "Reduce stress",
    "Protect focus time",
    "Find what energizes me",
    "Handle feedback better",
    "Improve work-life balance",
    "Grow my skills",
];

pub fn run_onboarding() -> Result<Config> {
    println!("──────────────────────────────────────────");
    println!("  Welcome to moodlog onboarding.");
    println!("──────────────────────────────────────────");

    let theme = ColorfulTheme::default();

    println!("\n[1/5] About you");
    let name: String = Input::with_theme(&theme)
        .with_prompt("  What should we call you?")
        .interact_text()
        .context("Failed to read name")?;

    let role_index = Select::with_theme(&theme)
        .with_prompt("  Your role")
        .default(0)
        .items(&ROLES)
        .interact()
        .context("Failed to select role")?;
    let role = ROLES.get(role_index).map(|role| role.to_string());

    println!("\n[2/5] What would you like to get out of moodlog?");
    let focus_indices = MultiSelect::with_theme(&theme)
        .with_prompt("  Pick any that apply (space to toggle)")
        .items(&FOCUS_AREAS)
        .interact()
        .context("Failed to select focus areas")?;
    let focus_areas = focus_indices
        .into_iter()
        .filter_map(|index| FOCUS_AREAS.get(index).map(|area| area.to_string()))
        .collect::<Vec<_>>();

    println!("\n[3/5] Your first project");
    let project_name: String = Input::with_theme(&theme)
        .with_prompt("  Project name")
        .default("General".to_string())
        .interact_text()
        .context("Failed to read project name")?;

    println!("\n[4/5] Daily reminder");
    let reminders_enabled = Confirm::with_theme(&theme)
        .with_prompt("  Remind you to log your day?")
        .default(true)
        .interact()
        .context("Failed to read reminder input")?;

    let reminder_time = if reminders_enabled {
        Input::with_theme(&theme)
            .with_prompt("  Reminder time")
            .default("18:00".to_string())
            .validate_with(|input: &String| -> std::result::Result<(), &str> {
                parse_hhmm(input)
                    .map(|_| ())
                    .map_err(|_| "Use HH:MM format (example: 18:00)")
            })
            .interact_text()
            .context("Failed to read reminder time")?
    } else {
        Settings::default().reminder_time
    };

    println!("\n[5/5] Report output directory");
    let default_report_dir = default_report_dir().display().to_string();
    let report_dir_input: String = Input::with_theme(&theme)
        .with_prompt("  Folder where reports will be saved")
        .default(default_report_dir)
        .interact_text()
        .context("Failed to read report directory")?;

    let report_dir = expand_home(&report_dir_input);
    println!("  ✓ {}", report_dir.display());

    let config = Config {
        report_dir,
        ..Config::load().unwrap_or_default()
    };
    config.ensure_bootstrap_files()?;
    config.save()?;

    let database = Database::open(&config.db_path)?;
    database.save_profile(&UserProfile {
        name: name.trim().to_string(),
        role,
        focus_areas,
        created_at: Utc::now(),
    })?;

    let project = match database.find_project(&project_name)? {
        Some(existing) => existing,
        None => database.add_project(&project_name, None)?,
    };

    database.save_settings(&Settings {
        reminders_enabled,
        reminder_time,
        default_project_id: Some(project.id.clone()),
        ..database.load_settings()?
    })?;
    database.set_onboarding_complete(true)?;

    println!("\n──────────────────────────────────────────");
    println!("  Onboarding complete, {}!", name.trim());
    println!("  Log your first task:");
    println!("    moodlog log \"What you worked on\" -e calm");
    println!("──────────────────────────────────────────");

    Ok(config)
}
