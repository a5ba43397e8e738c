//! SemanticAnalyzer - optional LLM-backed intent and risk reasoning
//!
//! Calls an OpenAI-compatible chat completions endpoint with a fixed
//! prompt and expects a JSON object back. Every failure mode (client
//! not configured, HTTP error, timeout, unparseable reply) drops to a
//! deterministic keyword heuristic. The fallback never raises.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use wingman_types::{DeploymentEnv, RiskLevel};

use crate::score::{ValidationInput, Validator, ValidatorScore};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const MAX_RETRIES: u32 = 1;

const SYSTEM_PROMPT: &str = "You are a change-risk reviewer for infrastructure \
instructions. Reply with a single JSON object: {\"risk_level\": \
\"LOW|MEDIUM|HIGH|CRITICAL\", \"score\": 0-100, \"intent_summary\": \"...\", \
\"concerns\": [\"...\"], \"reasoning\": \"...\"}. No prose outside the JSON.";

const DESTRUCTIVE_TERMS: [&str; 12] = [
    "delete", "drop", "truncate", "destroy", "wipe", "purge", "remove all", "force",
    "shutdown", "terminate", "overwrite", "revoke",
];

/// Connection settings for the LLM endpoint. `None` endpoint means the
/// analyzer runs in heuristic-only mode.
#[derive(Debug, Clone, Default)]
pub struct SemanticConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl SemanticConfig {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            api_key,
            model: model.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
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

#[derive(Debug, Deserialize)]
struct Verdict {
    risk_level: String,
    score: u8,
    #[serde(default)]
    intent_summary: String,
    #[serde(default)]
    concerns: Vec<String>,
    #[serde(default)]
    reasoning: String,
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        value.to_string()
    } else {
        let prefix: String = value.chars().take(max_chars).collect();
        format!("{prefix}...")
    }
}

fn resolve_chat_endpoint(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    if trimmed.ends_with("/chat/completions") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/chat/completions")
    }
}

/// Pulls the first top-level JSON object out of the model reply, which
/// may be wrapped in code fences or prose despite the prompt.
fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in content[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Intent and risk reasoning, LLM-backed with a heuristic floor.
pub struct SemanticAnalyzer {
    config: SemanticConfig,
    client: Option<reqwest::Client>,
}

impl SemanticAnalyzer {
    pub fn new(config: SemanticConfig) -> Self {
        let client = config.endpoint.as_ref().and_then(|_| {
            let timeout = if config.timeout_secs == 0 {
                DEFAULT_TIMEOUT_SECS
            } else {
                config.timeout_secs
            };
            match reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout))
                .no_proxy()
                .build()
            {
                Ok(client) => Some(client),
                Err(e) => {
                    tracing::warn!(error = %e, "semantic analyzer http client unavailable, heuristic only");
                    None
                }
            }
        });
        Self { config, client }
    }

    pub fn heuristic_only() -> Self {
        Self::new(SemanticConfig::disabled())
    }

    async fn ask_llm(&self, input: &ValidationInput) -> Result<Verdict, String> {
        let client = self.client.as_ref().ok_or("llm client not configured")?;
        let endpoint = self
            .config
            .endpoint
            .as_ref()
            .ok_or("llm endpoint not configured")?;
        let url = resolve_chat_endpoint(endpoint);

        let payload = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": format!(
                    "Task: {}\nEnvironment: {}\nInstruction:\n{}",
                    input.task_name, input.deployment_env, input.instruction
                ) },
            ],
            "temperature": 0.0,
        });

        let mut last_error = String::new();
        for attempt in 0..=MAX_RETRIES {
            let mut request = client.post(&url).json(&payload);
            if let Some(key) = &self.config.api_key {
                request = request.bearer_auth(key);
            }
            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    if !status.is_success() {
                        last_error = format!("llm error {status}: {}", truncate(&body, 320));
                    } else {
                        return parse_verdict(&body);
                    }
                }
                Err(e) => last_error = format!("llm request failed: {e}"),
            }
            if attempt < MAX_RETRIES {
                tracing::debug!(attempt = attempt + 1, "semantic analyzer retrying llm call");
            }
        }
        Err(last_error)
    }

    fn heuristic(&self, input: &ValidationInput) -> Verdict {
        let lower = format!("{} {}", input.task_name, input.instruction).to_ascii_lowercase();
        let hits: Vec<&str> = DESTRUCTIVE_TERMS
            .iter()
            .copied()
            .filter(|term| lower.contains(term))
            .collect();

        let in_production = input.deployment_env == DeploymentEnv::Prd
            || lower.contains("production")
            || lower.contains(" prd");

        let (risk, score) = match (hits.len(), in_production) {
            (0, false) => (RiskLevel::Low, 90),
            (0, true) => (RiskLevel::Medium, 70),
            (1..=2, false) => (RiskLevel::Medium, 60),
            (1..=2, true) => (RiskLevel::High, 40),
            (_, false) => (RiskLevel::High, 35),
            (_, true) => (RiskLevel::Critical, 20),
        };

        Verdict {
            risk_level: risk.as_str().to_string(),
            score,
            intent_summary: truncate(&input.instruction, 120),
            concerns: hits
                .iter()
                .map(|t| format!("destructive term: {t}"))
                .collect(),
            reasoning: format!(
                "heuristic: {} destructive terms, production context {}",
                hits.len(),
                in_production
            ),
        }
    }
}

fn parse_verdict(body: &str) -> Result<Verdict, String> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| format!("llm response parse: {e}"))?;
    let content = response
        .choices
        .first()
        .and_then(|c| c.message.content.as_deref())
        .ok_or("llm response had no content")?;
    let object = extract_json_object(content).ok_or("no json object in llm reply")?;
    serde_json::from_str(object).map_err(|e| format!("llm verdict parse: {e}"))
}

#[async_trait]
impl Validator for SemanticAnalyzer {
    fn name(&self) -> &'static str {
        "semantic_analyzer"
    }

    async fn validate(&self, input: &ValidationInput) -> ValidatorScore {
        let (verdict, source) = if self.client.is_some() {
            match self.ask_llm(input).await {
                Ok(verdict) => (verdict, "llm"),
                Err(reason) => {
                    tracing::warn!(reason, "semantic analyzer falling back to heuristic");
                    (self.heuristic(input), "heuristic")
                }
            }
        } else {
            (self.heuristic(input), "heuristic")
        };

        let risk = verdict
            .risk_level
            .parse::<RiskLevel>()
            .unwrap_or(RiskLevel::Medium);

        ValidatorScore::new(self.name(), verdict.score)
            .with_risk(risk)
            .with_concerns(verdict.concerns.clone())
            .with_details(json!({
                "source": source,
                "intent_summary": verdict.intent_summary,
                "reasoning": verdict.reasoning,
            }))
    }
}
