use crate::analyzer::categorizer::emotion_frequencies;
use crate::model::{EmotionCode, Task};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;

pub const LOCAL_SCORE_THRESHOLD: u32 = 20;
pub const AI_CONFIDENCE_THRESHOLD: u32 = 65;

const ALIAS_WEIGHT: u32 = 50;
const LONG_TRIGGER_WEIGHT: u32 = 60;
const SHORT_TRIGGER_WEIGHT: u32 = 45;
const TITLE_WORD_WEIGHT: u32 = 15;
const SUMMARY_WORD_WEIGHT: u32 = 5;

const DEFAULT_CHALLENGE_IDS: [&str; 3] = ["focus", "feedback", "work-life-balance"];

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z][a-z'-]*").expect("valid word regex"));

const STOP_WORDS: [&str; 24] = [
    "about", "after", "with", "from", "into", "your", "that", "this", "when", "what", "than",
    "them", "they", "have", "more", "feel", "feels", "there", "their", "work", "being", "over",
    "which", "keeps",
];

/// A recurring designer pain point with suggested next steps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChallengeTemplate {
    pub id: &'static str,
    pub title: &'static str,
    pub summary: &'static str,
    pub aliases: &'static [&'static str],
    pub triggers: &'static [&'static str],
    pub actions: &'static [&'static str],
}

pub static CHALLENGE_CATALOG: [ChallengeTemplate; 14] = [
    ChallengeTemplate {
        id: "stress",
        title: "Managing deadline stress",
        summary: "Tight timelines and pressure are making work feel overwhelming and rushed.",
        aliases: &["deadline stress", "under pressure", "overwhelmed"],
        triggers: &["tight deadline", "last minute", "deadline", "pressure", "urgent", "rushed"],
        actions: &[
            "List everything due this week and mark what can slip without real damage.",
            "Block two focused hours tomorrow morning for the most urgent item.",
            "Tell your lead early when a timeline looks unrealistic.",
        ],
    },
    ChallengeTemplate {
        id: "energy",
        title: "Recovering low energy",
        summary: "Energy levels are dropping and tasks leave you drained or tired.",
        aliases: &["burnout", "burned out", "running on empty"],
        triggers: &["no energy", "long day", "exhausted", "tired", "drained", "sleep"],
        actions: &[
            "Schedule one real break away from screens each afternoon.",
            "Move demanding design work to your highest-energy hours.",
            "End the day at a fixed time for the rest of the week.",
        ],
    },
    ChallengeTemplate {
        id: "creative-block",
        title: "Breaking a creative block",
        summary: "Ideas are not flowing and exploring new directions feels stuck.",
        aliases: &["creative block", "blank canvas", "out of ideas"],
        triggers: &["no ideas", "stuck on", "uninspired", "stuck", "blank", "inspiration"],
        actions: &[
            "Sketch ten rough thumbnails in ten minutes without judging them.",
            "Collect three references from outside your usual domain.",
            "Pair with a teammate for a short critique of early concepts.",
        ],
    },
    ChallengeTemplate {
        id: "feedback",
        title: "Handling tough feedback",
        summary: "Critique and revision requests are hard to process and act on.",
        aliases: &["harsh feedback", "design critique", "negative feedback"],
        triggers: &["more revisions", "feedback", "critique", "revisions", "rejected"],
        actions: &[
            "Write down the feedback and separate facts from feelings.",
            "Ask one clarifying question about the goal behind each comment.",
            "Share your next iteration early instead of polishing in private.",
        ],
    },
    ChallengeTemplate {
        id: "stakeholder-alignment",
        title: "Aligning stakeholders",
        summary: "Stakeholders want different outcomes and decisions keep shifting.",
        aliases: &["stakeholder alignment", "conflicting opinions", "too many cooks"],
        triggers: &["conflicting feedback", "stakeholder", "stakeholders", "approval", "sign-off"],
        actions: &[
            "Agree on a single decision maker for the current milestone.",
            "Restate the problem and success metrics at the start of each review.",
            "Document decisions and share them within the same day.",
        ],
    },
    ChallengeTemplate {
        id: "scope-creep",
        title: "Containing scope creep",
        summary: "Requirements keep expanding beyond what was originally planned.",
        aliases: &["scope creep", "moving goalposts", "feature creep"],
        triggers: &["new requirements", "changed requirements", "scope", "requirements", "expanding"],
        actions: &[
            "Keep a visible list of requests that arrived after kickoff.",
            "Trade every new request against something already planned.",
            "Confirm scope changes in writing before starting on them.",
        ],
    },
    ChallengeTemplate {
        id: "imposter-syndrome",
        title: "Quieting imposter syndrome",
        summary: "Doubting your skills and comparing yourself to others on the team.",
        aliases: &["imposter syndrome", "impostor syndrome", "not good enough"],
        triggers: &["self doubt", "compare myself", "doubt", "insecure", "inadequate"],
        actions: &[
            "Keep a running list of wins and positive feedback.",
            "Ask a mentor how they handled the same doubts.",
            "Share work in progress with one trusted peer this week.",
        ],
    },
    ChallengeTemplate {
        id: "meeting-overload",
        title: "Escaping meeting overload",
        summary: "Meetings and interruptions leave little time for focused design work.",
        aliases: &["meeting overload", "too many meetings", "back to back meetings"],
        triggers: &["back to back", "meetings", "interruptions", "calls", "standup"],
        actions: &[
            "Decline or shorten one recurring meeting that lacks a clear agenda.",
            "Protect a no-meeting block on your calendar.",
            "Batch quick questions into a single daily check-in.",
        ],
    },
    ChallengeTemplate {
        id: "perfectionism",
        title: "Letting go of perfectionism",
        summary: "Polishing details delays shipping and makes progress feel slow.",
        aliases: &["perfectionism", "pixel pushing", "never finished"],
        triggers: &["pixel perfect", "polishing", "polish", "tweaking", "perfect"],
        actions: &[
            "Define what good enough means before you start a task.",
            "Timebox polishing and ship when the box runs out.",
            "Ask for feedback at fifty percent completion.",
        ],
    },
    ChallengeTemplate {
        id: "handoff",
        title: "Smoothing design handoff",
        summary: "Collaboration with developers breaks down during implementation and handoff.",
        aliases: &["design handoff", "dev handoff", "implementation drift"],
        triggers: &["handoff", "developers", "implementation", "engineers", "redlines"],
        actions: &[
            "Walk developers through the design before handing it off.",
            "Document states and edge cases next to the screens.",
            "Review the first build together and log differences.",
        ],
    },
    ChallengeTemplate {
        id: "unclear-requirements",
        title: "Clarifying unclear requirements",
        summary: "Briefs are vague and it's unclear what problem the design should solve.",
        aliases: &["unclear requirements", "vague brief", "no clear brief"],
        triggers: &["not sure what", "unclear", "vague", "confusing", "ambiguous"],
        actions: &[
            "Write the problem statement yourself and ask for confirmation.",
            "List open questions and book fifteen minutes to resolve them.",
            "Sketch two directions to surface hidden expectations early.",
        ],
    },
    ChallengeTemplate {
        id: "focus",
        title: "Protecting focus time",
        summary: "Context switching and distractions make deep concentration difficult.",
        aliases: &["context switching", "constant distractions", "cannot focus"],
        triggers: &["hard to focus", "distracted", "distractions", "switching", "multitasking"],
        actions: &[
            "Pick one most important task each morning.",
            "Turn off notifications during focus blocks.",
            "Group similar tasks together to reduce switching.",
        ],
    },
    ChallengeTemplate {
        id: "presenting",
        title: "Presenting work with confidence",
        summary: "Presenting designs and defending decisions in front of others feels nerve-racking.",
        aliases: &["presentation nerves", "presenting designs", "public speaking"],
        triggers: &["design review", "presentation", "presenting", "demo", "pitch"],
        actions: &[
            "Open every presentation with the problem and the goal.",
            "Rehearse the first two minutes out loud.",
            "Prepare answers for the three hardest likely questions.",
        ],
    },
    ChallengeTemplate {
        id: "work-life-balance",
        title: "Restoring work-life balance",
        summary: "Work is spilling into evenings and weekends and personal time is shrinking.",
        aliases: &["work-life balance", "work life balance", "always on"],
        triggers: &["late night", "weekend", "overtime", "evening", "after hours"],
        actions: &[
            "Set a shutdown time and write tomorrow's plan before it.",
            "Move work apps off your phone's home screen.",
            "Plan one non-work activity for this weekend.",
        ],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeSource {
    Ai,
    Keyword,
    EmotionPattern,
    Default,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChallengeRecommendation {
    pub source: ChallengeSource,
    pub score: Option<u32>,
    pub reason: String,
    pub challenges: Vec<&'static ChallengeTemplate>,
}

/// Confidence reported for a template by the remote text service.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalChallengeScore {
    pub id: String,
    pub confidence: u32,
    pub reason: Option<String>,
}

pub fn find_challenge(id: &str) -> Option<&'static ChallengeTemplate> {
    CHALLENGE_CATALOG.iter().find(|template| template.id == id)
}

/// Scores one template against lower-cased input text and its word set.
pub fn score_template(template: &ChallengeTemplate, text: &str, words: &HashSet<String>) -> u32 {
    let alias_score = template
        .aliases
        .iter()
        .filter(|alias| text.contains(&alias.to_lowercase()))
        .count() as u32
        * ALIAS_WEIGHT;

    let trigger_score = template
        .triggers
        .iter()
        .filter(|trigger| contains_phrase(text, words, trigger))
        .map(|trigger| {
            if trigger.contains(' ') {
                LONG_TRIGGER_WEIGHT
            } else {
                SHORT_TRIGGER_WEIGHT
            }
        })
        .sum::<u32>();

    let title_score = significant_words(template.title, 4)
        .filter(|word| words.contains(word))
        .count() as u32
        * TITLE_WORD_WEIGHT;

    let summary_score = significant_words(template.summary, 5)
        .filter(|word| words.contains(word))
        .count() as u32
        * SUMMARY_WORD_WEIGHT;

    alias_score + trigger_score + title_score + summary_score
}

/// Best keyword match over the catalog, if it clears the local threshold.
///
/// Earlier catalog entries win ties.
pub fn match_by_keywords(tasks: &[&Task]) -> Option<(&'static ChallengeTemplate, u32)> {
    let text = challenge_text(tasks);
    let words = word_set(&text);

    CHALLENGE_CATALOG
        .iter()
        .map(|template| (template, score_template(template, &text, &words)))
        .fold(None, |best: Option<(&'static ChallengeTemplate, u32)>, candidate| {
            match best {
                Some((_, best_score)) if best_score >= candidate.1 => best,
                _ => Some(candidate),
            }
        })
        .filter(|(_, score)| *score >= LOCAL_SCORE_THRESHOLD)
}

/// Picks the highest-confidence external score that clears the AI threshold.
pub fn match_by_external_scores(
    scores: &[ExternalChallengeScore],
) -> Option<(&'static ChallengeTemplate, &ExternalChallengeScore)> {
    scores
        .iter()
        .filter(|score| score.confidence >= AI_CONFIDENCE_THRESHOLD)
        .filter_map(|score| find_challenge(score.id.trim()).map(|template| (template, score)))
        .fold(None, |best: Option<(&'static ChallengeTemplate, &ExternalChallengeScore)>, candidate| {
            match best {
                Some((_, current)) if current.confidence >= candidate.1.confidence => best,
                _ => Some(candidate),
            }
        })
}

/// Rule-based path keyed on the dominant group of negative emotions.
pub fn match_by_emotions(tasks: &[&Task]) -> Option<(&'static ChallengeTemplate, usize)> {
    let frequencies = emotion_frequencies(tasks.iter().copied());
    let count_of = |code: EmotionCode| {
        frequencies
            .iter()
            .find(|(candidate, _)| *candidate == code)
            .map(|(_, count)| *count)
            .unwrap_or_default()
    };

    let groups = [
        ("stress", count_of(EmotionCode::ANXIOUS) + count_of(EmotionCode::FRUSTRATED)),
        ("energy", count_of(EmotionCode::DRAINED) + count_of(EmotionCode::TIRED)),
        ("creative-block", count_of(EmotionCode::ANNOYED) + count_of(EmotionCode::SAD)),
    ];

    groups
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .fold(None, |best: Option<(&str, usize)>, candidate| match best {
            Some((_, best_count)) if best_count >= candidate.1 => best,
            _ => Some(candidate),
        })
        .and_then(|(id, count)| find_challenge(id).map(|template| (template, count)))
}

pub fn default_challenges() -> Vec<&'static ChallengeTemplate> {
    DEFAULT_CHALLENGE_IDS
        .iter()
        .filter_map(|id| find_challenge(id))
        .collect()
}

/// Local fallback chain: keywords, then negative emotion groups, then defaults.
pub fn recommend_locally(tasks: &[&Task]) -> ChallengeRecommendation {
    if let Some((template, score)) = match_by_keywords(tasks) {
        return ChallengeRecommendation {
            source: ChallengeSource::Keyword,
            score: Some(score),
            reason: format!("Your task notes mention themes related to \"{}\".", template.title),
            challenges: vec![template],
        };
    }

    if let Some((template, count)) = match_by_emotions(tasks) {
        return ChallengeRecommendation {
            source: ChallengeSource::EmotionPattern,
            score: None,
            reason: format!(
                "{count} of your logged feelings point toward \"{}\".",
                template.title
            ),
            challenges: vec![template],
        };
    }

    ChallengeRecommendation {
        source: ChallengeSource::Default,
        score: None,
        reason: "Log a few more tasks to get a personalized challenge.".to_string(),
        challenges: default_challenges(),
    }
}

/// Full chain with an optional externally scored candidate list in front.
pub fn recommend_challenge(
    tasks: &[&Task],
    external: Option<&[ExternalChallengeScore]>,
) -> ChallengeRecommendation {
    if let Some((template, score)) = external.and_then(match_by_external_scores) {
        return ChallengeRecommendation {
            source: ChallengeSource::Ai,
            score: Some(score.confidence),
            reason: score
                .reason
                .clone()
                .filter(|reason| !reason.trim().is_empty())
                .unwrap_or_else(|| format!("Suggested based on your recent tasks: \"{}\".", template.title)),
            challenges: vec![template],
        };
    }

    recommend_locally(tasks)
}

/// Lower-cased descriptions, notes and emotion labels.
pub fn challenge_text(tasks: &[&Task]) -> String {
    tasks
        .iter()
        .map(|task| {
            let labels = task
                .emotions
                .iter()
                .map(|code| code.label())
                .collect::<Vec<_>>()
                .join(" ");
            format!(
                "{} {} {}",
                task.description,
                task.notes.as_deref().unwrap_or_default(),
                labels
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase()
}

fn word_set(text: &str) -> HashSet<String> {
    WORD_RE
        .find_iter(text)
        .map(|found| found.as_str().to_string())
        .collect()
}

fn contains_phrase(text: &str, words: &HashSet<String>, phrase: &str) -> bool {
    let phrase = phrase.to_lowercase();
    if phrase.contains(' ') {
        text.contains(&phrase)
    } else {
        words.contains(&phrase)
    }
}

fn significant_words(source: &str, min_len: usize) -> impl Iterator<Item = String> + '_ {
    let lowered = source.to_lowercase();
    let words = WORD_RE
        .find_iter(&lowered)
        .map(|found| found.as_str().trim_matches('\'').to_string())
        .filter(|word| word.len() >= min_len && !STOP_WORDS.contains(&word.as_str()))
        .collect::<HashSet<_>>();
    words.into_iter()
}
