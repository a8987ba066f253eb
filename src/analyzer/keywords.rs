use crate::model::Task;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

pub const TAG_COUNT: usize = 3;
const MIN_WORD_LEN: usize = 5;
const FILLER_TAGS: [&str; 3] = ["Daily tasks", "Work activities", "Project updates"];

const THEME_PATTERNS: [(&str, &str); 25] = [
    // time of day
    ("Morning focus", r"\b(morning|early start|sunrise|breakfast)\b"),
    ("Late-night work", r"\b(late night|midnight|evening|overtime|after hours)\b"),
    // social
    ("Team collaboration", r"\b(team\w*|collaborat\w*|pairing|pair programming|together|workshop\w*)\b"),
    ("Client work", r"\b(clients?|customers?|stakeholders?)\b"),
    ("Mentoring", r"\b(mentor\w*|coach\w*|onboard\w*|teach\w*)\b"),
    // work patterns
    ("Deep focus", r"\b(focus\w*|deep work|heads down|concentrat\w*)\b"),
    ("Context switching", r"\b(multitask\w*|context switch\w*|juggl\w*|interrupt\w*)\b"),
    ("Deadline pressure", r"\b(deadlines?|urgent|rush\w*|asap|crunch)\b"),
    // project types
    ("Design work", r"\b(design\w*|wireframe\w*|mockups?|prototyp\w*|figma|ui|ux)\b"),
    ("Research & discovery", r"\b(research\w*|interview\w*|survey\w*|usability|discovery)\b"),
    ("Development work", r"\b(code|coding|develop\w*|implement\w*|debug\w*|refactor\w*|deploy\w*)\b"),
    ("Planning & strategy", r"\b(plan|planning|roadmap\w*|strateg\w*|prioriti\w*)\b"),
    ("Documentation", r"\b(document\w*|docs|writing|write-up|specs?)\b"),
    // accomplishments
    ("Feature completion", r"\b(finish\w*|complet\w*|shipp?(ed|ing)?|launch\w*|releas\w*|deliver\w*)\b"),
    ("Problem solving", r"\b(fix\w*|solv\w*|resolv\w*|troubleshoot\w*|bugs?)\b"),
    ("Learning & growth", r"\b(learn\w*|stud(y|ied|ying)|course|tutorial\w*|explor\w*)\b"),
    // challenges
    ("Blockers", r"\b(block\w*|stuck|waiting on|dependenc\w*)\b"),
    ("Feedback & revisions", r"\b(feedback|revis\w*|critique\w*|iterat\w*|redo)\b"),
    ("Scope changes", r"\b(scope|requirements?|pivot\w*|changed plans?)\b"),
    // communication
    ("Meetings", r"\b(meetings?|standups?|stand-ups?|syncs?|calls?|1:1s?)\b"),
    ("Presentations", r"\b(present\w*|demos?|pitch\w*|slides?)\b"),
    ("Email & messaging", r"\b(emails?|slack|messag\w*|inbox)\b"),
    ("Code & design reviews", r"\b(reviews?|reviewing|pull requests?|prs?|audit\w*)\b"),
    // personal
    ("Self-care", r"\b(break|walk\w*|exercis\w*|gym|meditat\w*|rest)\b"),
    ("Admin & chores", r"\b(admin\w*|invoic\w*|expenses?|timesheets?|paperwork)\b"),
];

static THEMES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    THEME_PATTERNS
        .iter()
        .map(|(label, pattern)| {
            let regex = Regex::new(&format!("(?i){pattern}")).expect("valid theme regex");
            (*label, regex)
        })
        .collect()
});

static GENERIC_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(daily tasks|work activities|project updates|meetings|review sessions|(design|research|development|planning|admin|general) (tasks|work))$",
    )
    .expect("valid generic tag regex")
});

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z][A-Za-z'-]*").expect("valid word regex"));

const STOP_WORDS: [&str; 40] = [
    "about", "after", "again", "being", "could", "doing", "every", "first", "going", "great",
    "their", "there", "these", "thing", "things", "think", "those", "today", "tomorrow", "which",
    "while", "would", "worked", "working", "other", "where", "really", "still", "should", "since",
    "started", "finally", "before", "because", "during", "maybe", "mostly", "quite", "little",
    "pretty",
];

/// A theme pattern and how often it matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeMatch {
    pub label: &'static str,
    pub count: usize,
}

/// Counts matches of every theme pattern over the descriptions and notes.
///
/// Only themes with at least one match are returned, most frequent first and
/// in pattern order on ties.
pub fn match_themes<'a, I>(tasks: I) -> Vec<ThemeMatch>
where
    I: IntoIterator<Item = &'a Task>,
{
    let text = task_text(tasks);
    let mut matches = THEMES
        .iter()
        .map(|(label, regex)| ThemeMatch {
            label: *label,
            count: regex.find_iter(&text).count(),
        })
        .filter(|theme| theme.count > 0)
        .collect::<Vec<_>>();

    // stable sort keeps pattern order for equal counts
    matches.sort_by(|left, right| right.count.cmp(&left.count));
    matches
}

/// Produces exactly three summary tags for a set of tasks.
pub fn generate_summary_tags<'a, I>(tasks: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Task>,
{
    let tasks = tasks.into_iter().collect::<Vec<_>>();
    let mut tags = Vec::with_capacity(TAG_COUNT);

    let themes = match_themes(tasks.iter().copied());
    let candidates = themes
        .iter()
        .map(|theme| theme.label.to_string())
        .chain(task_type_tags(&tasks))
        .chain(frequent_words(&tasks))
        .chain(FILLER_TAGS.iter().map(|tag| tag.to_string()));

    for candidate in candidates {
        if tags.len() == TAG_COUNT {
            break;
        }
        if !tags
            .iter()
            .any(|existing: &String| existing.eq_ignore_ascii_case(&candidate))
        {
            tags.push(candidate);
        }
    }

    tags
}

/// False when no tag carries signal beyond the generic fallbacks.
pub fn tags_are_meaningful(tags: &[String]) -> bool {
    tags.iter().any(|tag| !GENERIC_TAG_RE.is_match(tag.trim()))
}

pub fn task_type_tag(task_type: &str) -> Option<&'static str> {
    match task_type.trim().to_lowercase().as_str() {
        "design" => Some("Design tasks"),
        "meeting" | "meetings" => Some("Meetings"),
        "research" => Some("Research tasks"),
        "development" | "dev" | "coding" => Some("Development tasks"),
        "review" => Some("Review sessions"),
        "planning" => Some("Planning tasks"),
        "admin" => Some("Admin tasks"),
        _ => None,
    }
}

fn task_type_tags(tasks: &[&Task]) -> Vec<String> {
    let mut counts: Vec<(&'static str, usize)> = Vec::new();
    for tag in tasks.iter().filter_map(|task| task_type_tag(&task.task_type)) {
        match counts.iter_mut().find(|(existing, _)| *existing == tag) {
            Some((_, count)) => *count += 1,
            None => counts.push((tag, 1)),
        }
    }

    counts.sort_by(|left, right| right.1.cmp(&left.1));
    counts.into_iter().map(|(tag, _)| tag.to_string()).collect()
}

fn frequent_words(tasks: &[&Task]) -> Vec<String> {
    let text = task_text(tasks.iter().copied());
    let mut first_seen = HashMap::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for (position, word) in WORD_RE
        .find_iter(&text)
        .map(|found| found.as_str().to_lowercase())
        .filter(|word| word.len() >= MIN_WORD_LEN && !STOP_WORDS.contains(&word.as_str()))
        .enumerate()
    {
        first_seen.entry(word.clone()).or_insert(position);
        *counts.entry(word).or_default() += 1;
    }

    let mut words = counts.into_iter().collect::<Vec<_>>();
    words.sort_by(|left, right| {
        right
            .1
            .cmp(&left.1)
            .then_with(|| first_seen[&left.0].cmp(&first_seen[&right.0]))
    });

    words
        .into_iter()
        .map(|(word, _)| capitalize(&word))
        .collect()
}

fn task_text<'a, I>(tasks: I) -> String
where
    I: IntoIterator<Item = &'a Task>,
{
    tasks
        .into_iter()
        .flat_map(|task| [Some(task.description.as_str()), task.notes.as_deref()])
        .flatten()
        .collect::<Vec<_>>()
        .join(" \n ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{generate_summary_tags, match_themes, tags_are_meaningful};
    use crate::model::EmotionCode;
    use crate::model::fixtures::task;

    #[test]
    fn top_themes_ranked_by_match_count() {
        let tasks = vec![
            task("Team standup and team retro", &[EmotionCode::HAPPY]),
            task("Finished the checkout redesign", &[EmotionCode::PROUD]),
            task("Sync with the team about launch", &[EmotionCode::EXCITED]),
        ];
        let themes = match_themes(&tasks);

        assert_eq!(themes[0].label, "Team collaboration");
        assert_eq!(themes[0].count, 3);

        let tags = generate_summary_tags(&tasks);
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0], "Team collaboration");
        assert!(tags.contains(&"Feature completion".to_string()));
    }

    #[test]
    fn empty_tasks_fall_back_to_fillers() {
        let tags = generate_summary_tags(&[]);

        assert_eq!(tags, vec!["Daily tasks", "Work activities", "Project updates"]);
        assert!(!tags_are_meaningful(&tags));
    }

    #[test]
    fn falls_back_to_task_type_then_frequent_words() {
        let first = task("Homepage illustrations", &[EmotionCode::CALM]);
        let mut second = task("Homepage typography", &[EmotionCode::CALM]);
        second.task_type = "admin".to_string();
        let tasks = vec![first, second];

        let tags = generate_summary_tags(&tasks);

        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0], "Design tasks");
        assert_eq!(tags[1], "Admin tasks");
        assert_eq!(tags[2], "Homepage");
        assert!(tags_are_meaningful(&tags));
    }

    #[test]
    fn always_exactly_three_tags() {
        let samples = [
            "a",
            "Quick fix",
            "Design review with client, then fixing bugs late night",
        ];

        for description in samples {
            let tasks = vec![task(description, &[EmotionCode::FOCUSED])];
            assert_eq!(generate_summary_tags(&tasks).len(), 3, "{description}");
        }
    }

    #[test]
    fn generic_tags_are_not_meaningful() {
        let generic = vec![
            "Design tasks".to_string(),
            "Meetings".to_string(),
            "Daily tasks".to_string(),
        ];
        let mixed = vec!["Design tasks".to_string(), "Client work".to_string()];

        assert!(!tags_are_meaningful(&generic));
        assert!(tags_are_meaningful(&mixed));
        assert!(!tags_are_meaningful(&[]));
    }
}
