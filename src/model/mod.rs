pub mod emotion;

pub use emotion::EmotionCode;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid emotion code: {0} (expected 1-16)")]
    InvalidEmotionCode(String),
    #[error("task {0} has no emotion")]
    MissingEmotion(String),
}

/// A logged unit of work.
///
/// `emotions` is always non-empty and de-duplicated; the first element is the
/// primary emotion, which older records stored in the singular `emotion` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TaskRecord", into = "TaskRecord")]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub description: String,
    pub task_type: String,
    pub emotions: Vec<EmotionCode>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn primary_emotion(&self) -> EmotionCode {
        self.emotions[0]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    id: String,
    project_id: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    task_type: String,
    #[serde(default)]
    emotion: Option<EmotionCode>,
    #[serde(default)]
    emotions: Vec<EmotionCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TaskRecord> for Task {
    type Error = ModelError;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        let candidates = if record.emotions.is_empty() {
            record.emotion.into_iter().collect::<Vec<_>>()
        } else {
            record.emotions
        };
        let emotions = dedup_emotions(candidates);

        if emotions.is_empty() {
            return Err(ModelError::MissingEmotion(record.id));
        }

        Ok(Self {
            id: record.id,
            project_id: record.project_id,
            description: record.description,
            task_type: record.task_type,
            emotions,
            notes: record.notes.filter(|notes| !notes.trim().is_empty()),
            created_at: record.created_at,
        })
    }
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        Self {
            emotion: task.emotions.first().copied(),
            id: task.id,
            project_id: task.project_id,
            description: task.description,
            task_type: task.task_type,
            emotions: task.emotions,
            notes: task.notes,
            created_at: task.created_at,
        }
    }
}

pub fn dedup_emotions(codes: impl IntoIterator<Item = EmotionCode>) -> Vec<EmotionCode> {
    codes.into_iter().fold(Vec::new(), |mut acc, code| {
        if !acc.contains(&code) {
            acc.push(code);
        }
        acc
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_feeling: Option<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            date,
            tasks: Vec::new(),
            overall_feeling: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub reminders_enabled: bool,
    pub reminder_time: String,
    pub default_project_id: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reminders_enabled: false,
            reminder_time: "18:00".to_string(),
            default_project_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    #[serde(default = "export_version")]
    pub version: String,
    #[serde(default)]
    pub entries: Vec<Entry>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub user_profile: Option<UserProfile>,
    pub exported_at: DateTime<Utc>,
}

fn export_version() -> String {
    EXPORT_VERSION.to_string()
}

pub fn flatten_tasks(entries: &[Entry]) -> Vec<&Task> {
    entries.iter().flat_map(|entry| entry.tasks.iter()).collect()
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}


#[cfg(test)]
mod tests {
    use super::{EmotionCode, Task};

    #[test]
    fn legacy_single_emotion_is_normalized() {
        let json = r#"{
            "id": "t1",
            "projectId": "p1",
            "description": "Homepage wireframes",
            "taskType": "design",
            "emotion": "3",
            "createdAt": "2024-03-04T10:00:00Z"
        }"#;

        let task: Task = serde_json::from_str(json).expect("legacy task");
        assert_eq!(task.emotions, vec![EmotionCode::EXCITED]);
        assert_eq!(task.primary_emotion(), EmotionCode::EXCITED);
    }

    #[test]
    fn plural_emotions_supersede_singular() {
        let json = r#"{
            "id": "t1",
            "projectId": "p1",
            "description": "Sprint review",
            "taskType": "meeting",
            "emotion": 1,
            "emotions": [5, 4, 5],
            "createdAt": "2024-03-04T10:00:00Z"
        }"#;

        let task: Task = serde_json::from_str(json).expect("multi emotion task");
        assert_eq!(task.emotions, vec![EmotionCode::ANXIOUS, EmotionCode::FRUSTRATED]);
    }

    #[test]
    fn task_without_emotion_is_rejected() {
        let json = r#"{
            "id": "t1",
            "projectId": "p1",
            "createdAt": "2024-03-04T10:00:00Z"
        }"#;

        assert!(serde_json::from_str::<Task>(json).is_err());
    }

    #[test]
    fn serialized_task_keeps_legacy_field() {
        let task = super::fixtures::task("Docs", &[EmotionCode::CALM, EmotionCode::FOCUSED]);
        let value = serde_json::to_value(&task).expect("serialize");

        assert_eq!(value["emotion"], 2);
        assert_eq!(value["emotions"], serde_json::json!([2, 12]));
        assert_eq!(value["projectId"], "project-1");
    }
}
