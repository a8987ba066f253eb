pub mod queries;

use crate::model::{
    EXPORT_VERSION, EmotionCode, Entry, ExportDocument, ModelError, Project, Settings, Task,
    UserProfile, dedup_emotions, new_id,
};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const RECOVERED_PROJECT_ID: &str = "recovered-projects";
pub const RECOVERED_PROJECT_NAME: &str = "Recovered Projects";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const PROJECT_PALETTE: [&str; 6] = [
    "#7EC8E3", "#FFD166", "#FF8C42", "#EF476F", "#9B72CF", "#06D6A0",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("tasks reference missing projects: {}", .task_ids.join(", "))]
    InvalidProjectReference { task_ids: Vec<String> },
    #[error("overall feeling must be between 0 and 100, got {0}")]
    InvalidFeeling(i64),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("project not found: {0}")]
    ProjectNotFound(String),
    #[error("a project named \"{0}\" already exists")]
    DuplicateProject(String),
    #[error("stored value {0} is unreadable; refusing to overwrite it")]
    CorruptStore(String),
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub project_id: String,
    pub description: String,
    pub task_type: String,
    pub emotions: Vec<EmotionCode>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub project_id: Option<String>,
    pub description: Option<String>,
    pub task_type: Option<String>,
    pub emotions: Option<Vec<EmotionCode>>,
    /// `Some("")` clears the notes.
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanedTask {
    pub date: NaiveDate,
    pub task_id: String,
    pub project_id: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub entries: usize,
    pub tasks: usize,
    pub projects: usize,
    pub recovered_tasks: usize,
}

pub struct Database {
    conn: Connection,
}

/// On-disk entry shape with tasks left raw so one bad task cannot hide the
/// rest of the entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    id: String,
    date: NaiveDate,
    #[serde(default)]
    tasks: Vec<serde_json::Value>,
    #[serde(default)]
    overall_feeling: Option<u8>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("Failed to set SQLite busy timeout")?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite DB")?;
        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }

    /// Runs `work` inside `BEGIN IMMEDIATE`, so read-modify-write cycles from
    /// concurrent connections serialize instead of overwriting each other.
    /// Commits on Ok, rolls back on Err.
    fn with_transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .context("Failed to begin write transaction")?;

        match work(self) {
            Ok(value) => {
                self.conn
                    .execute_batch("COMMIT")
                    .context("Failed to commit write transaction")?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(error)
            }
        }
    }

    pub fn get_raw(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(queries::SELECT_VALUE, params![key], |row| row.get(0))
            .optional()
            .with_context(|| format!("Failed to read stored value: {key}"))
    }

    pub fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                queries::UPSERT_VALUE,
                params![key, value, Utc::now().timestamp()],
            )
            .with_context(|| format!("Failed to write stored value: {key}"))?;

        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute(queries::DELETE_VALUE, params![key])
            .with_context(|| format!("Failed to delete stored value: {key}"))?;

        Ok(())
    }

    /// Reads a JSON value. A value that no longer parses is logged and
    /// treated as absent.
    fn load_value<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let Some(raw) = self.get_raw(key)? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                warn!(key, error = %error, "stored value is corrupt; ignoring it");
                Ok(None)
            }
        }
    }

    fn store_value<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let content = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialize stored value: {key}"))?;
        self.set_raw(key, &content)
    }

    /// Loads entries for display. Unreadable tasks are skipped; an unreadable
    /// blob reads as empty.
    pub fn load_entries(&self) -> Result<Vec<Entry>> {
        let Some(raw) = self.get_raw(queries::KEY_ENTRIES)? else {
            return Ok(Vec::new());
        };

        match parse_entries(&raw) {
            Ok((entries, _)) => Ok(entries),
            Err(error) => {
                warn!(
                    key = queries::KEY_ENTRIES,
                    error = %error,
                    "stored entries are corrupt; ignoring them"
                );
                Ok(Vec::new())
            }
        }
    }

    /// Loads entries that are about to be rewritten. An unreadable blob is an
    /// error so it is never replaced; when individual records had to be
    /// skipped the original blob is copied to the backup key first.
    fn load_entries_for_update(&self) -> Result<Vec<Entry>> {
        let Some(raw) = self.get_raw(queries::KEY_ENTRIES)? else {
            return Ok(Vec::new());
        };

        let (entries, skipped) = parse_entries(&raw).map_err(|error| {
            warn!(
                key = queries::KEY_ENTRIES,
                error = %error,
                "refusing to overwrite corrupt entries"
            );
            StorageError::CorruptStore(queries::KEY_ENTRIES.to_string())
        })?;

        if skipped > 0 {
            self.set_raw(queries::KEY_ENTRIES_BACKUP, &raw)?;
            warn!(
                skipped,
                backup = queries::KEY_ENTRIES_BACKUP,
                "unreadable records will be dropped; original entries kept in backup"
            );
        }

        Ok(entries)
    }

    /// Persists all entries after checking every task's project reference.
    pub fn save_entries(&self, entries: &[Entry]) -> Result<()> {
        let project_ids = self
            .load_projects()?
            .into_iter()
            .map(|project| project.id)
            .collect::<HashSet<_>>();

        let invalid = entries
            .iter()
            .flat_map(|entry| entry.tasks.iter())
            .filter(|task| !project_ids.contains(&task.project_id))
            .map(|task| task.id.clone())
            .collect::<Vec<_>>();

        if !invalid.is_empty() {
            return Err(StorageError::InvalidProjectReference { task_ids: invalid }.into());
        }

        let mut sorted = entries.to_vec();
        sorted.sort_by_key(|entry| entry.date);
        self.store_value(queries::KEY_ENTRIES, &sorted)
    }

    pub fn entries_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Entry>> {
        Ok(self
            .load_entries()?
            .into_iter()
            .filter(|entry| entry.date >= from && entry.date <= to)
            .collect())
    }

    pub fn entry_for_date(&self, date: NaiveDate) -> Result<Option<Entry>> {
        Ok(self
            .load_entries()?
            .into_iter()
            .find(|entry| entry.date == date))
    }

    /// Appends a task to the date's entry, creating the entry when missing.
    pub fn add_task(&self, date: NaiveDate, new_task: NewTask) -> Result<Task> {
        let emotions = dedup_emotions(new_task.emotions);
        if emotions.is_empty() {
            return Err(ModelError::MissingEmotion(new_task.description).into());
        }

        let task = Task {
            id: new_id(),
            project_id: new_task.project_id,
            description: new_task.description.trim().to_string(),
            task_type: new_task.task_type.trim().to_lowercase(),
            emotions,
            notes: new_task
                .notes
                .map(|notes| notes.trim().to_string())
                .filter(|notes| !notes.is_empty()),
            created_at: Utc::now(),
        };

        self.with_transaction(|database| {
            let mut entries = database.load_entries_for_update()?;
            match entries.iter_mut().find(|entry| entry.date == date) {
                Some(entry) => {
                    entry.tasks.push(task.clone());
                    entry.updated_at = Utc::now();
                }
                None => {
                    let mut entry = Entry::new(date);
                    entry.tasks.push(task.clone());
                    entries.push(entry);
                }
            }

            database.save_entries(&entries)
        })?;
        info!(task_id = %task.id, date = %date, "task logged");
        Ok(task)
    }

    pub fn update_task(&self, task_id: &str, update: TaskUpdate) -> Result<Task> {
        self.with_transaction(|database| {
            let mut entries = database.load_entries_for_update()?;
            let (entry, index) = entries
                .iter_mut()
                .find_map(|entry| {
                    let index = entry.tasks.iter().position(|task| task.id == task_id)?;
                    Some((entry, index))
                })
                .ok_or_else(|| StorageError::TaskNotFound(task_id.to_string()))?;

            let task = &mut entry.tasks[index];
            if let Some(project_id) = update.project_id {
                task.project_id = project_id;
            }
            if let Some(description) = update.description {
                task.description = description.trim().to_string();
            }
            if let Some(task_type) = update.task_type {
                task.task_type = task_type.trim().to_lowercase();
            }
            if let Some(emotions) = update.emotions {
                let emotions = dedup_emotions(emotions);
                if emotions.is_empty() {
                    return Err(ModelError::MissingEmotion(task_id.to_string()).into());
                }
                task.emotions = emotions;
            }
            if let Some(notes) = update.notes {
                let trimmed = notes.trim().to_string();
                task.notes = (!trimmed.is_empty()).then_some(trimmed);
            }

            let updated = task.clone();
            entry.updated_at = Utc::now();
            database.save_entries(&entries)?;

            Ok(updated)
        })
    }

    pub fn delete_task(&self, task_id: &str) -> Result<()> {
        self.with_transaction(|database| {
            let mut entries = database.load_entries_for_update()?;
            let entry = entries
                .iter_mut()
                .find(|entry| entry.tasks.iter().any(|task| task.id == task_id))
                .ok_or_else(|| StorageError::TaskNotFound(task_id.to_string()))?;

            entry.tasks.retain(|task| task.id != task_id);
            entry.updated_at = Utc::now();
            database.save_entries(&entries)
        })
    }

    pub fn set_overall_feeling(&self, date: NaiveDate, value: i64) -> Result<Entry> {
        let feeling = u8::try_from(value)
            .ok()
            .filter(|feeling| *feeling <= 100)
            .ok_or(StorageError::InvalidFeeling(value))?;

        self.with_transaction(|database| {
            let mut entries = database.load_entries_for_update()?;
            let entry = match entries.iter().position(|entry| entry.date == date) {
                Some(index) => &mut entries[index],
                None => {
                    entries.push(Entry::new(date));
                    entries.last_mut().context("entry was just pushed")?
                }
            };
            entry.overall_feeling = Some(feeling);
            entry.updated_at = Utc::now();
            let saved = entry.clone();

            database.save_entries(&entries)?;
            Ok(saved)
        })
    }

    pub fn load_projects(&self) -> Result<Vec<Project>> {
        Ok(self
            .load_value(queries::KEY_PROJECTS)?
            .unwrap_or_default())
    }

    pub fn save_projects(&self, projects: &[Project]) -> Result<()> {
        self.store_value(queries::KEY_PROJECTS, projects)
    }

    pub fn add_project(&self, name: &str, color: Option<&str>) -> Result<Project> {
        let name = name.trim();
        self.with_transaction(|database| {
            let mut projects = database.load_projects()?;
            if projects
                .iter()
                .any(|project| project.name.eq_ignore_ascii_case(name))
            {
                return Err(StorageError::DuplicateProject(name.to_string()).into());
            }

            let project = Project {
                id: new_id(),
                name: name.to_string(),
                color: color.map(str::to_string).unwrap_or_else(|| {
                    PROJECT_PALETTE[projects.len() % PROJECT_PALETTE.len()].to_string()
                }),
                created_at: Utc::now(),
            };
            projects.push(project.clone());
            database.save_projects(&projects)?;

            Ok(project)
        })
    }

    /// Looks a project up by id first, then by case-insensitive name.
    pub fn find_project(&self, id_or_name: &str) -> Result<Option<Project>> {
        let projects = self.load_projects()?;
        let needle = id_or_name.trim();

        Ok(projects
            .iter()
            .find(|project| project.id == needle)
            .or_else(|| {
                projects
                    .iter()
                    .find(|project| project.name.eq_ignore_ascii_case(needle))
            })
            .cloned())
    }

    /// Removes a project and every task logged against it. Returns the number
    /// of tasks removed.
    pub fn delete_project(&self, project_id: &str) -> Result<usize> {
        self.with_transaction(|database| {
            let mut projects = database.load_projects()?;
            if !projects.iter().any(|project| project.id == project_id) {
                return Err(StorageError::ProjectNotFound(project_id.to_string()).into());
            }

            let mut entries = database.load_entries_for_update()?;
            let removed = entries
                .iter_mut()
                .map(|entry| {
                    let before = entry.tasks.len();
                    entry.tasks.retain(|task| task.project_id != project_id);
                    before - entry.tasks.len()
                })
                .sum::<usize>();

            database.save_entries(&entries)?;
            projects.retain(|project| project.id != project_id);
            database.save_projects(&projects)?;

            Ok(removed)
        })
    }

    pub fn find_orphaned_tasks(&self) -> Result<Vec<OrphanedTask>> {
        let project_ids = self
            .load_projects()?
            .into_iter()
            .map(|project| project.id)
            .collect::<HashSet<_>>();

        Ok(self
            .load_entries()?
            .iter()
            .flat_map(|entry| {
                entry
                    .tasks
                    .iter()
                    .filter(|task| !project_ids.contains(&task.project_id))
                    .map(|task| OrphanedTask {
                        date: entry.date,
                        task_id: task.id.clone(),
                        project_id: task.project_id.clone(),
                        description: task.description.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect())
    }

    /// Moves every orphaned task into the "Recovered Projects" project.
    pub fn recover_orphaned_tasks(&self) -> Result<usize> {
        self.with_transaction(|database| {
            let mut projects = database.load_projects()?;
            let mut entries = database.load_entries_for_update()?;

            let moved = reassign_orphans(&mut entries, &mut projects);
            if moved == 0 {
                return Ok(0);
            }

            database.save_projects(&projects)?;
            database.save_entries(&entries)?;
            warn!(moved, "orphaned tasks moved to {RECOVERED_PROJECT_NAME}");

            Ok(moved)
        })
    }

    pub fn load_settings(&self) -> Result<Settings> {
        Ok(self
            .load_value(queries::KEY_SETTINGS)?
            .unwrap_or_default())
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.store_value(queries::KEY_SETTINGS, settings)
    }

    pub fn load_profile(&self) -> Result<Option<UserProfile>> {
        self.load_value(queries::KEY_USER_PROFILE)
    }

    pub fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        self.store_value(queries::KEY_USER_PROFILE, profile)
    }

    pub fn onboarding_complete(&self) -> Result<bool> {
        Ok(self
            .load_value::<bool>(queries::KEY_ONBOARDING)?
            .unwrap_or(false))
    }

    pub fn set_onboarding_complete(&self, complete: bool) -> Result<()> {
        self.store_value(queries::KEY_ONBOARDING, &complete)
    }

    pub fn export_data(&self) -> Result<ExportDocument> {
        Ok(ExportDocument {
            version: EXPORT_VERSION.to_string(),
            entries: self.load_entries()?,
            projects: self.load_projects()?,
            user_profile: self.load_profile()?,
            exported_at: Utc::now(),
        })
    }

    /// Replaces all entries, projects and the profile with an export document.
    /// Tasks pointing at unknown projects are moved to the recovery project.
    pub fn import_data(&self, document: ExportDocument) -> Result<ImportSummary> {
        if document.version != EXPORT_VERSION {
            warn!(version = %document.version, "importing export with unexpected version");
        }

        let ExportDocument {
            mut entries,
            mut projects,
            user_profile,
            ..
        } = document;

        let recovered_tasks = reassign_orphans(&mut entries, &mut projects);
        if recovered_tasks > 0 {
            warn!(recovered_tasks, "imported tasks referenced missing projects");
        }

        self.with_transaction(|database| {
            database.save_projects(&projects)?;
            database.save_entries(&entries)?;
            match &user_profile {
                Some(profile) => database.save_profile(profile),
                None => database.remove(queries::KEY_USER_PROFILE),
            }
        })?;

        let summary = ImportSummary {
            entries: entries.len(),
            tasks: entries.iter().map(|entry| entry.tasks.len()).sum(),
            projects: projects.len(),
            recovered_tasks,
        };
        info!(entries = summary.entries, tasks = summary.tasks, "data imported");

        Ok(summary)
    }
}

/// Parses the entries blob record by record. Entries or tasks that no longer
/// deserialize are logged and skipped; the count of skipped records is
/// returned alongside the sorted entries. Only a blob that is not a JSON
/// array at all is an error.
fn parse_entries(raw: &str) -> serde_json::Result<(Vec<Entry>, usize)> {
    let records: Vec<serde_json::Value> = serde_json::from_str(raw)?;
    let mut skipped = 0;
    let mut entries = Vec::with_capacity(records.len());

    for record in records {
        let stored = match serde_json::from_value::<StoredEntry>(record) {
            Ok(stored) => stored,
            Err(error) => {
                warn!(error = %error, "skipping unreadable entry");
                skipped += 1;
                continue;
            }
        };

        let mut tasks = Vec::with_capacity(stored.tasks.len());
        for value in stored.tasks {
            match serde_json::from_value::<Task>(value) {
                Ok(task) => tasks.push(task),
                Err(error) => {
                    warn!(entry_id = %stored.id, error = %error, "skipping unreadable task");
                    skipped += 1;
                }
            }
        }

        entries.push(Entry {
            id: stored.id,
            date: stored.date,
            tasks,
            overall_feeling: stored.overall_feeling.filter(|feeling| *feeling <= 100),
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        });
    }

    entries.sort_by_key(|entry| entry.date);
    Ok((entries, skipped))
}

fn reassign_orphans(entries: &mut [Entry], projects: &mut Vec<Project>) -> usize {
    let project_ids = projects
        .iter()
        .map(|project| project.id.clone())
        .collect::<HashSet<_>>();

    let mut moved = 0;
    for entry in entries.iter_mut() {
        for task in entry
            .tasks
            .iter_mut()
            .filter(|task| !project_ids.contains(&task.project_id))
        {
            task.project_id = RECOVERED_PROJECT_ID.to_string();
            moved += 1;
        }
    }

    if moved > 0 && !projects.iter().any(|project| project.id == RECOVERED_PROJECT_ID) {
        projects.push(Project {
            id: RECOVERED_PROJECT_ID.to_string(),
            name: RECOVERED_PROJECT_NAME.to_string(),
            color: "#B0B0B0".to_string(),
            created_at: Utc::now(),
        });
    }

    moved
}

#[cfg(test)]
mod tests {
    use super::{
        Database, NewTask, RECOVERED_PROJECT_ID, StorageError, TaskUpdate, queries,
    };
    use crate::model::{EmotionCode, Entry};
    use chrono::NaiveDate;

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid date")
    }

    fn new_task(project_id: &str, description: &str, emotions: &[EmotionCode]) -> NewTask {
        NewTask {
            project_id: project_id.to_string(),
            description: description.to_string(),
            task_type: "Design".to_string(),
            emotions: emotions.to_vec(),
            notes: None,
        }
    }

    #[test]
    fn one_entry_per_date() {
        let database = Database::open_in_memory().expect("db");
        let project = database.add_project("Website", None).expect("project");

        database
            .add_task(date("2024-03-04"), new_task(&project.id, "Hero", &[EmotionCode::HAPPY]))
            .expect("first task");
        database
            .add_task(date("2024-03-04"), new_task(&project.id, "Footer", &[EmotionCode::CALM]))
            .expect("second task");
        database
            .add_task(date("2024-03-05"), new_task(&project.id, "Nav", &[EmotionCode::TIRED]))
            .expect("third task");

        let entries = database.load_entries().expect("entries");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].tasks.len(), 2);
        assert_eq!(entries[0].tasks[0].task_type, "design");
    }

    #[test]
    fn save_rejects_unknown_project() {
        let database = Database::open_in_memory().expect("db");

        let error = database
            .add_task(date("2024-03-04"), new_task("missing", "Hero", &[EmotionCode::HAPPY]))
            .expect_err("invalid reference");

        assert!(matches!(
            error.downcast_ref::<StorageError>(),
            Some(StorageError::InvalidProjectReference { .. })
        ));
        assert!(database.load_entries().expect("entries").is_empty());
    }

    #[test]
    fn update_and_delete_task() {
        let database = Database::open_in_memory().expect("db");
        let project = database.add_project("Website", None).expect("project");
        let task = database
            .add_task(date("2024-03-04"), new_task(&project.id, "Hero", &[EmotionCode::HAPPY]))
            .expect("task");

        let updated = database
            .update_task(
                &task.id,
                TaskUpdate {
                    emotions: Some(vec![EmotionCode::PROUD, EmotionCode::PROUD]),
                    notes: Some("Shipped it".to_string()),
                    ..TaskUpdate::default()
                },
            )
            .expect("update");
        assert_eq!(updated.emotions, vec![EmotionCode::PROUD]);
        assert_eq!(updated.notes.as_deref(), Some("Shipped it"));

        database.delete_task(&task.id).expect("delete");
        let error = database.delete_task(&task.id).expect_err("already gone");
        assert!(matches!(
            error.downcast_ref::<StorageError>(),
            Some(StorageError::TaskNotFound(_))
        ));
    }

    #[test]
    fn overall_feeling_is_validated() {
        let database = Database::open_in_memory().expect("db");

        let entry = database
            .set_overall_feeling(date("2024-03-04"), 72)
            .expect("feeling");
        assert_eq!(entry.overall_feeling, Some(72));
        assert!(database.set_overall_feeling(date("2024-03-04"), 101).is_err());
        assert!(database.set_overall_feeling(date("2024-03-04"), -1).is_err());
    }

    #[test]
    fn duplicate_project_names_rejected() {
        let database = Database::open_in_memory().expect("db");
        database.add_project("Website", None).expect("project");

        assert!(database.add_project("website", None).is_err());
        assert_eq!(
            database
                .find_project("WEBSITE")
                .expect("lookup")
                .map(|project| project.name),
            Some("Website".to_string())
        );
    }

    #[test]
    fn delete_project_cascades_tasks() {
        let database = Database::open_in_memory().expect("db");
        let keep = database.add_project("Keep", None).expect("project");
        let drop = database.add_project("Drop", None).expect("project");
        database
            .add_task(date("2024-03-04"), new_task(&keep.id, "A", &[EmotionCode::HAPPY]))
            .expect("task");
        database
            .add_task(date("2024-03-04"), new_task(&drop.id, "B", &[EmotionCode::SAD]))
            .expect("task");

        assert_eq!(database.delete_project(&drop.id).expect("delete"), 1);
        assert_eq!(database.load_projects().expect("projects").len(), 1);
        assert_eq!(database.load_entries().expect("entries")[0].tasks.len(), 1);
    }

    #[test]
    fn orphaned_tasks_are_recovered() {
        let database = Database::open_in_memory().expect("db");
        let project = database.add_project("Website", None).expect("project");
        database
            .add_task(date("2024-03-04"), new_task(&project.id, "Hero", &[EmotionCode::HAPPY]))
            .expect("task");

        // simulate a project removed behind the entries' back
        database.save_projects(&[]).expect("drop projects");
        let orphans = database.find_orphaned_tasks().expect("orphans");
        assert_eq!(orphans.len(), 1);

        assert_eq!(database.recover_orphaned_tasks().expect("recover"), 1);
        assert!(database.find_orphaned_tasks().expect("orphans").is_empty());
        let entries = database.load_entries().expect("entries");
        assert_eq!(entries[0].tasks[0].project_id, RECOVERED_PROJECT_ID);
        assert_eq!(database.recover_orphaned_tasks().expect("recover again"), 0);
    }

    #[test]
    fn corrupt_values_load_as_empty() {
        let database = Database::open_in_memory().expect("db");
        database
            .set_raw(queries::KEY_ENTRIES, "{not json")
            .expect("write");

        assert!(database.load_entries().expect("entries").is_empty());
        assert!(!database.onboarding_complete().expect("flag"));
    }

    #[test]
    fn unreadable_task_is_skipped_and_backed_up() {
        let database = Database::open_in_memory().expect("db");
        let project = database.add_project("Website", None).expect("project");
        let raw = format!(
            r#"[{{"id":"e1","date":"2024-03-04","tasks":[{{"id":"t1","projectId":"{id}","description":"Hero","taskType":"design","emotion":2,"createdAt":"2024-03-04T10:00:00Z"}},{{"id":"t2","projectId":"{id}","description":"Footer","taskType":"design","emotion":17,"createdAt":"2024-03-04T11:00:00Z"}}],"createdAt":"2024-03-04T10:00:00Z","updatedAt":"2024-03-04T11:00:00Z"}}]"#,
            id = project.id
        );
        database.set_raw(queries::KEY_ENTRIES, &raw).expect("write");

        let entries = database.load_entries().expect("entries");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tasks.len(), 1);
        assert_eq!(entries[0].tasks[0].id, "t1");

        database
            .add_task(date("2024-03-03"), new_task(&project.id, "Nav", &[EmotionCode::CALM]))
            .expect("task");

        let entries = database.load_entries().expect("entries");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].tasks[0].id, "t1");
        assert_eq!(
            database.get_raw(queries::KEY_ENTRIES_BACKUP).expect("backup"),
            Some(raw)
        );
    }

    #[test]
    fn corrupt_entries_are_never_overwritten() {
        let database = Database::open_in_memory().expect("db");
        let project = database.add_project("Website", None).expect("project");
        database
            .set_raw(queries::KEY_ENTRIES, "{not json")
            .expect("write");

        let error = database
            .add_task(date("2024-03-04"), new_task(&project.id, "Hero", &[EmotionCode::HAPPY]))
            .expect_err("corrupt store");
        assert!(matches!(
            error.downcast_ref::<StorageError>(),
            Some(StorageError::CorruptStore(_))
        ));
        assert!(database.set_overall_feeling(date("2024-03-04"), 50).is_err());
        assert_eq!(
            database.get_raw(queries::KEY_ENTRIES).expect("raw").as_deref(),
            Some("{not json")
        );
    }

    #[test]
    fn concurrent_writers_keep_every_task() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("moodlog.db");
        let project = Database::open(&path)
            .expect("db")
            .add_project("Website", None)
            .expect("project");

        std::thread::scope(|scope| {
            for writer in 0..4 {
                let path = &path;
                let project_id = &project.id;
                scope.spawn(move || {
                    let database = Database::open(path).expect("db");
                    for index in 0..25 {
                        database
                            .add_task(
                                date("2024-03-04"),
                                new_task(
                                    project_id,
                                    &format!("Task {writer}-{index}"),
                                    &[EmotionCode::FOCUSED],
                                ),
                            )
                            .expect("task");
                    }
                });
            }
        });

        let entries = Database::open(&path)
            .expect("db")
            .load_entries()
            .expect("entries");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tasks.len(), 100);
    }

    #[test]
    fn settings_from_older_versions_still_load() {
        let database = Database::open_in_memory().expect("db");
        database
            .set_raw(
                queries::KEY_SETTINGS,
                r#"{"theme":"dark","remindersEnabled":true,"reminderTime":"09:30"}"#,
            )
            .expect("write");

        let settings = database.load_settings().expect("settings");
        assert!(settings.reminders_enabled);
        assert_eq!(settings.reminder_time, "09:30");
        assert_eq!(settings.default_project_id, None);
    }

    #[test]
    fn string_encoded_emotions_are_reparsed() {
        let database = Database::open_in_memory().expect("db");
        database
            .set_raw(
                queries::KEY_ENTRIES,
                r#"[{"id":"e1","date":"2024-03-04","tasks":[{"id":"t1","projectId":"p1","description":"Hero","taskType":"design","emotion":"10","createdAt":"2024-03-04T10:00:00Z"}],"createdAt":"2024-03-04T10:00:00Z","updatedAt":"2024-03-04T10:00:00Z"}]"#,
            )
            .expect("write");

        let entries = database.load_entries().expect("entries");
        assert_eq!(entries[0].tasks[0].emotions, vec![EmotionCode::ENERGIZED]);
    }

    #[test]
    fn export_import_round_trip_preserves_emotions() {
        let source = Database::open_in_memory().expect("db");
        let project = source.add_project("Website", None).expect("project");
        source
            .add_task(
                date("2024-03-04"),
                new_task(&project.id, "Hero", &[EmotionCode::ANXIOUS, EmotionCode::INSPIRED]),
            )
            .expect("task");
        source.set_overall_feeling(date("2024-03-04"), 40).expect("feeling");

        let exported = serde_json::to_string(&source.export_data().expect("export"))
            .expect("serialize");

        let target = Database::open_in_memory().expect("db");
        let summary = target
            .import_data(serde_json::from_str(&exported).expect("parse export"))
            .expect("import");
        assert_eq!(summary.tasks, 1);
        assert_eq!(summary.recovered_tasks, 0);

        let original: Vec<Entry> = source.load_entries().expect("entries");
        let restored = target.load_entries().expect("entries");
        assert_eq!(restored, original);
        assert_eq!(
            restored[0].tasks[0].emotions,
            vec![EmotionCode::ANXIOUS, EmotionCode::INSPIRED]
        );
    }

    #[test]
    fn import_repairs_missing_projects() {
        let source = Database::open_in_memory().expect("db");
        let project = source.add_project("Website", None).expect("project");
        source
            .add_task(date("2024-03-04"), new_task(&project.id, "Hero", &[EmotionCode::HAPPY]))
            .expect("task");
        let mut document = source.export_data().expect("export");
        document.projects.clear();

        let target = Database::open_in_memory().expect("db");
        let summary = target.import_data(document).expect("import");

        assert_eq!(summary.recovered_tasks, 1);
        assert!(target
            .find_project(RECOVERED_PROJECT_ID)
            .expect("lookup")
            .is_some());
    }
}
