pub mod cache;

use crate::analyzer::TimeRange;
use crate::analyzer::categorizer::EmotionBreakdown;
use crate::analyzer::challenge::{CHALLENGE_CATALOG, ExternalChallengeScore};
use crate::config::Config;
use crate::model::Task;
use anyhow::{Context, Result, anyhow, bail};
use cache::ResponseCache;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::info;

const MAX_TASKS_IN_PROMPT: usize = 60;

/// Remote text generation seam.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, system: &str, user: &str) -> Result<String>;
}

/// OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    base_url: String,
    model: String,
    timeout_seconds: u64,
    api_key: String,
}

impl ChatCompletionClient {
    /// Returns `None` when AI is disabled or no key is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        if !config.ai_enabled {
            return None;
        }

        resolve_api_key(config).map(|api_key| Self {
            base_url: config.ai_api_base_url.clone(),
            model: config.ai_model.clone(),
            timeout_seconds: config.ai_timeout_seconds.max(5),
            api_key,
        })
    }
}

impl TextGenerator for ChatCompletionClient {
    fn generate(&self, system: &str, user: &str) -> Result<String> {
        let client = self.clone();
        let system = system.to_string();
        let user = user.to_string();

        // reqwest's blocking client must not run on an async runtime thread
        std::thread::spawn(move || {
            chat_completion_blocking(
                &client.base_url,
                &client.model,
                client.timeout_seconds,
                &client.api_key,
                &system,
                &user,
            )
        })
        .join()
        .map_err(|_| anyhow!("AI worker thread panicked"))?
    }
}

/// Text generator plus its response cache.
pub struct AiAssist {
    generator: Box<dyn TextGenerator>,
    cache: ResponseCache,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsightPayload {
    #[serde(default)]
    insight: Option<String>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
    #[serde(default, alias = "use_pattern_based", alias = "useRuleBased")]
    use_pattern_based: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChallengePayload {
    #[serde(default)]
    matches: Option<Vec<ChallengeMatchItem>>,
    #[serde(default, alias = "use_rule_based", alias = "usePatternBased")]
    use_rule_based: bool,
}

#[derive(Debug, Deserialize)]
struct ChallengeMatchItem {
    id: String,
    confidence: f64,
    #[serde(default)]
    reason: Option<String>,
}

impl AiAssist {
    pub fn new(generator: Box<dyn TextGenerator>, cache: ResponseCache) -> Self {
        Self { generator, cache }
    }

    pub fn from_config(config: &Config) -> Option<Self> {
        ChatCompletionClient::from_config(config).map(|client| {
            Self::new(
                Box::new(client),
                ResponseCache::new(Duration::from_secs(config.ai_cache_ttl_seconds)),
            )
        })
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Narrative for a period. `Ok(None)` means the service asked for the
    /// rule-based fallback.
    pub fn weekly_insight(
        &self,
        tasks: &[&Task],
        breakdown: &EmotionBreakdown,
        time_range: TimeRange,
    ) -> Result<Option<String>> {
        let payload = json!({
            "tasks": task_payload(tasks),
            "feelings": breakdown,
            "timeRange": time_range.as_str(),
        });
        let system = r#"You write one or two warm, concrete sentences reflecting on a person's logged work and feelings. Return JSON only: {"insight":"..."}. If the data is too thin, return {"usePatternBased":true}."#;

        let parsed: InsightPayload = self.request_json("insight", system, &payload)?;
        if parsed.use_pattern_based {
            return Ok(None);
        }

        Ok(parsed
            .insight
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()))
    }

    /// Up to three short theme keywords. `Ok(None)` means use the local extractor.
    pub fn summary_keywords(
        &self,
        tasks: &[&Task],
        time_range: TimeRange,
    ) -> Result<Option<Vec<String>>> {
        let payload = json!({
            "tasks": task_payload(tasks),
            "timeRange": time_range.as_str(),
        });
        let system = r#"Extract exactly three short theme keywords (2-3 words each, Title case) describing the work below. Return JSON only: {"keywords":["...","...","..."]}. If nothing stands out, return {"usePatternBased":true}."#;

        let parsed: InsightPayload = self.request_json("keywords", system, &payload)?;
        if parsed.use_pattern_based {
            return Ok(None);
        }

        let keywords = parsed
            .keywords
            .unwrap_or_default()
            .into_iter()
            .map(|keyword| keyword.trim().to_string())
            .filter(|keyword| !keyword.is_empty())
            .take(3)
            .collect::<Vec<_>>();

        Ok((!keywords.is_empty()).then_some(keywords))
    }

    /// Confidence per challenge template. `Ok(None)` means use the local matcher.
    pub fn challenge_scores(&self, tasks: &[&Task]) -> Result<Option<Vec<ExternalChallengeScore>>> {
        let catalog = CHALLENGE_CATALOG
            .iter()
            .map(|template| {
                json!({
                    "id": template.id,
                    "title": template.title,
                    "summary": template.summary,
                })
            })
            .collect::<Vec<_>>();
        let payload = json!({
            "tasks": task_payload(tasks),
            "challenges": catalog,
        });
        let system = r#"You match a designer's logged tasks and feelings to the most relevant challenges from the given catalog. Return JSON only: {"matches":[{"id":"<catalog id>","confidence":0-100,"reason":"one sentence"}]}. If no challenge fits, return {"useRuleBased":true}."#;

        let parsed: ChallengePayload = self.request_json("challenges", system, &payload)?;
        if parsed.use_rule_based {
            return Ok(None);
        }

        let scores = parsed
            .matches
            .unwrap_or_default()
            .into_iter()
            .map(|item| ExternalChallengeScore {
                id: item.id.trim().to_string(),
                confidence: item.confidence.clamp(0.0, 100.0).round() as u32,
                reason: item.reason.map(|reason| reason.trim().to_string()),
            })
            .collect::<Vec<_>>();

        Ok(Some(scores))
    }

    fn request_json<T>(&self, kind: &str, system: &str, payload: &Value) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let user = payload.to_string();
        let key = ResponseCache::key(kind, &user);

        let content = match self.cache.get(&key) {
            Some(cached) => cached,
            None => {
                let fresh = self.generator.generate(system, &user)?;
                self.cache.insert(key.clone(), fresh.clone());
                fresh
            }
        };

        let extracted = extract_json_block(&content);
        serde_json::from_str(&extracted)
            .inspect_err(|_| {
                self.cache.invalidate(&key);
            })
            .with_context(|| format!("Failed to parse AI JSON payload. content: {content}"))
    }
}

pub fn test_connection(config: &Config) -> Result<String> {
    let api_key = resolve_api_key(config).context(
        "AI API key is missing. Set `moodlog config set ai.api_key <KEY>` or `MOODLOG_AI_API_KEY`.",
    )?;

    let client = ChatCompletionClient {
        base_url: config.ai_api_base_url.clone(),
        model: config.ai_model.clone(),
        timeout_seconds: config.ai_timeout_seconds.max(5),
        api_key,
    };

    let response = client.generate(
        "Return exactly one short, friendly sentence confirming the connection works.",
        "Health check for moodlog.",
    )?;
    info!("AI connection check succeeded");
    Ok(response)
}

pub fn has_api_key(config: &Config) -> bool {
    resolve_api_key(config).is_some()
}

fn resolve_api_key(config: &Config) -> Option<String> {
    std::env::var("MOODLOG_AI_API_KEY")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .or_else(|| {
            config
                .ai_api_key
                .clone()
                .filter(|value| !value.trim().is_empty())
        })
}

fn task_payload(tasks: &[&Task]) -> Vec<Value> {
    tasks
        .iter()
        .take(MAX_TASKS_IN_PROMPT)
        .map(|task| {
            json!({
                "description": task.description,
                "taskType": task.task_type,
                "notes": task.notes,
                "emotions": task.emotions.iter().map(|code| code.label()).collect::<Vec<_>>(),
            })
        })
        .collect()
}

fn chat_completion_blocking(
    base_url: &str,
    model: &str,
    timeout_seconds: u64,
    api_key: &str,
    system: &str,
    user: &str,
) -> Result<String> {
    if api_key.trim().is_empty() {
        bail!("AI API key is empty");
    }

    let endpoint = format!("{}/chat/completions", base_url.trim_end_matches('/'));

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {api_key}"))
            .context("Failed to build Authorization header")?,
    );

    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .default_headers(headers)
        .build()
        .context("Failed to create AI HTTP client")?;

    let request_body = json!({
        "model": model,
        "temperature": 0.4,
        "messages": [
            {"role": "system", "content": system},
            {"role": "user", "content": user}
        ]
    });

    let response = client
        .post(endpoint)
        .json(&request_body)
        .send()
        .context("AI API request failed")?;

    let status = response.status();
    let body = response.text().context("Failed to read AI response body")?;

    if !status.is_success() {
        bail!("AI API error {}: {}", status, body);
    }

    let parsed: ChatCompletionResponse = serde_json::from_str(&body)
        .with_context(|| format!("Failed to parse AI response: {body}"))?;

    parsed
        .choices
        .first()
        .and_then(|choice| choice.message.content.clone())
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| anyhow!("AI response did not include message.content"))
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

fn extract_json_block(content: &str) -> String {
    let fenced = content.split("```").map(str::trim).find_map(|block| {
        block
            .strip_prefix("json")
            .map(str::trim)
            .or_else(|| block.starts_with('{').then_some(block))
    });

    match fenced {
        Some(block) => block.to_string(),
        None => {
            let first = content.find('{');
            let last = content.rfind('}');

            match (first, last) {
                (Some(start), Some(end)) if end > start => content[start..=end].to_string(),
                _ => content.trim().to_string(),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::TextGenerator;
    use anyhow::{Result, bail};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a canned response, or fails when none is set.
    pub struct FakeGenerator {
        pub response: Mutex<Option<String>>,
        pub calls: AtomicUsize,
    }

    impl FakeGenerator {
        pub fn replying(response: &str) -> Self {
            Self {
                response: Mutex::new(Some(response.to_string())),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                response: Mutex::new(None),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl TextGenerator for FakeGenerator {
        fn generate(&self, _system: &str, _user: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.response.lock().ok().and_then(|guard| guard.clone()) {
                Some(response) => Ok(response),
                None => bail!("connection refused"),
            }
        }
    }

    impl TextGenerator for std::sync::Arc<FakeGenerator> {
        fn generate(&self, system: &str, user: &str) -> Result<String> {
            self.as_ref().generate(system, user)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeGenerator;
    use super::{AiAssist, extract_json_block};
    use crate::ai::cache::ResponseCache;
    use crate::analyzer::TimeRange;
    use crate::analyzer::categorizer::EmotionBreakdown;
    use crate::model::EmotionCode;
    use crate::model::fixtures::task;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn assist(generator: Arc<FakeGenerator>) -> AiAssist {
        AiAssist::new(Box::new(generator), ResponseCache::new(Duration::from_secs(60)))
    }

    #[test]
    fn extracts_fenced_json() {
        let content = "Here you go:\n```json\n{\"insight\":\"Nice week\"}\n```";
        assert_eq!(extract_json_block(content), "{\"insight\":\"Nice week\"}");
        assert_eq!(extract_json_block("noise {\"a\":1} tail"), "{\"a\":1}");
    }

    #[test]
    fn insight_responses_are_cached() {
        let generator = Arc::new(FakeGenerator::replying(r#"{"insight":"  Calm and steady.  "}"#));
        let assist = assist(Arc::clone(&generator));
        let tasks = vec![task("Wireframes", &[EmotionCode::CALM])];
        let refs = tasks.iter().collect::<Vec<_>>();

        let first = assist
            .weekly_insight(&refs, &EmotionBreakdown::uniform(), TimeRange::Week)
            .expect("insight");
        let second = assist
            .weekly_insight(&refs, &EmotionBreakdown::uniform(), TimeRange::Week)
            .expect("insight");

        assert_eq!(first.as_deref(), Some("Calm and steady."));
        assert_eq!(first, second);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pattern_based_flag_requests_fallback() {
        let generator = Arc::new(FakeGenerator::replying(r#"{"usePatternBased":true}"#));
        let assist = assist(generator);
        let tasks = vec![task("Wireframes", &[EmotionCode::CALM])];
        let refs = tasks.iter().collect::<Vec<_>>();

        assert_eq!(assist.summary_keywords(&refs, TimeRange::Week).expect("keywords"), None);
    }

    #[test]
    fn challenge_scores_are_clamped() {
        let generator = Arc::new(FakeGenerator::replying(
            r#"{"matches":[{"id":" focus ","confidence":140.2,"reason":"Lots of switching."}]}"#,
        ));
        let assist = assist(generator);

        let scores = assist
            .challenge_scores(&[])
            .expect("scores")
            .expect("matches present");
        assert_eq!(scores[0].id, "focus");
        assert_eq!(scores[0].confidence, 100);
    }

    #[test]
    fn unparseable_responses_are_not_cached() {
        let generator = Arc::new(FakeGenerator::replying("I cannot help with that."));
        let assist = assist(Arc::clone(&generator));

        assert!(assist.challenge_scores(&[]).is_err());
        assert_eq!(assist.cache().len(), 0);
        assert!(assist.challenge_scores(&[]).is_err());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn generator_failures_propagate() {
        let assist = assist(Arc::new(FakeGenerator::failing()));
        assert!(assist.challenge_scores(&[]).is_err());
    }
}
