use std::cell::RefCell;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::assistant::CompletionService;
use crate::config::AssistantConfig;
use crate::directive::ASSISTANT_DIRECTIVE_INSTRUCTIONS;
use crate::error::CompletionError;
use crate::resume::ResumeData;

const EMPTY_REPLY: &str = "I couldn't generate a response.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: &'a Content,
    contents: Vec<Content>,
    tools: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateContentResponse {
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().map(|part| part.text.as_str()).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// The assistant's standing instructions: persona, directive grammar and the resume.
pub fn system_instruction(resume: &ResumeData) -> String {
    let resume_json = serde_json::to_string_pretty(resume).unwrap_or_default();
    format!(
        "You are the assistant on {name}'s portfolio page. Answer questions about their \
         experience, projects and skills concisely and professionally, using the resume \
         data below and web search when needed.\n\n{directive}\n\nHere is the resume data:\n{resume_json}",
        name = resume.contact.name,
        directive = ASSISTANT_DIRECTIVE_INSTRUCTIONS,
    )
}

/// Chat session against the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    config: AssistantConfig,
    api_key: Option<String>,
    system_instruction: Content,
    history: RefCell<Vec<Content>>,
}

impl GeminiClient {
    pub fn new(config: AssistantConfig, resume: &ResumeData) -> Self {
        let api_key = config.api_key();
        if api_key.is_none() {
            warn!(
                "No API key in ${}; the assistant will answer with an error",
                config.api_key_env
            );
        }
        Self {
            http: reqwest::Client::new(),
            api_key,
            system_instruction: Content::text(None, &system_instruction(resume)),
            history: RefCell::new(Vec::new()),
            config,
        }
    }

    fn url(&self, api_key: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.endpoint.trim_end_matches('/'),
            urlencoding::encode(&self.config.model),
            urlencoding::encode(api_key)
        )
    }

    async fn generate(&self, api_key: &str, contents: Vec<Content>) -> Result<String, CompletionError> {
        let request = GenerateContentRequest {
            system_instruction: &self.system_instruction,
            contents,
            tools: vec![serde_json::json!({ "google_search": {} })],
        };

        let response = self.http.post(self.url(api_key)).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::from_status(status.as_u16(), body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| CompletionError::Malformed(err.to_string()))?;
        Ok(parsed.text().unwrap_or_else(|| EMPTY_REPLY.to_string()))
    }
}

/// Runs `attempt` until it succeeds, fails with a non-overloaded error, or
/// `max_retries` retries are spent. The delay starts at `initial` and doubles.
pub async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    initial: Duration,
    mut attempt: F,
) -> Result<T, CompletionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CompletionError>>,
{
    let mut delay = initial;
    let mut retries_left = max_retries;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_overloaded() && retries_left > 0 => {
                warn!(
                    "Model overloaded. Retrying in {}ms... ({} attempts left)",
                    delay.as_millis(),
                    retries_left
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                retries_left -= 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[async_trait(?Send)]
impl CompletionService for GeminiClient {
    async fn send_message(&self, text: &str) -> Result<String, CompletionError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(CompletionError::MissingApiKey(self.config.api_key_env.clone()));
        };

        let user_turn = Content::text(Some("user"), text);
        let mut contents = self.history.borrow().clone();
        contents.push(user_turn.clone());

        let reply = retry_with_backoff(
            self.config.max_retries,
            Duration::from_millis(self.config.initial_backoff_ms),
            || self.generate(api_key, contents.clone()),
        )
        .await?;

        debug!("Received {} chars from {}", reply.len(), self.config.model);
        let mut history = self.history.borrow_mut();
        history.push(user_turn);
        history.push(Content::text(Some("model"), &reply));
        Ok(reply)
    }
}
