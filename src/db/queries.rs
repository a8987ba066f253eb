pub const CREATE_KV_STORE: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
  key        TEXT PRIMARY KEY NOT NULL,
  value      TEXT NOT NULL,
  updated_at INTEGER NOT NULL
);
"#;

pub const SELECT_VALUE: &str = "SELECT value FROM kv_store WHERE key = ?1";

pub const UPSERT_VALUE: &str = "INSERT INTO kv_store (key, value, updated_at)
     VALUES (?1, ?2, ?3)
     ON CONFLICT(key)
     DO UPDATE SET value=excluded.value, updated_at=excluded.updated_at";

pub const DELETE_VALUE: &str = "DELETE FROM kv_store WHERE key = ?1";

pub const KEY_ENTRIES: &str = "moodlog.entries";
pub const KEY_ENTRIES_BACKUP: &str = "moodlog.entries.corrupt";
pub const KEY_PROJECTS: &str = "moodlog.projects";
pub const KEY_SETTINGS: &str = "moodlog.settings";
pub const KEY_ONBOARDING: &str = "moodlog.onboarding_complete";
pub const KEY_USER_PROFILE: &str = "moodlog.user_profile";

pub fn schema_statements() -> Vec<&'static str> {
    vec![CREATE_KV_STORE]
}
