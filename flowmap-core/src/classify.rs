//! Flow classification against an OpenAI-compatible chat completions API.

use crate::flows::Flow;
use crate::summary::FlowSummary;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.1-8b-instant";
const TEMPERATURE: f64 = 0.3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub type Result<T> = std::result::Result<T, ClassifyError>;

#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Unusable classifier settings (bad base url, client construction)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection failed or timed out
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response from the API
    #[error("API error: {0}")]
    Api(String),

    /// Response body or message content was not the expected JSON
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Classifier returned an empty response")]
    EmptyResponse,
}

/// What the classifier made of a crawl summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No classifier is configured. Not an error.
    Unavailable,
    /// A classifier was reached but the call failed.
    Error(String),
    /// Paths as returned by the classifier, not yet resolved to urls.
    Classified {
        global_nav_urls: Vec<String>,
        flows: Vec<Flow>,
    },
}

/// Raw classifier answer. Every field is optional; defaults are filled in by
/// [`ClassifierResponse::into_classification`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierResponse {
    pub global_nav_urls: Option<Vec<String>>,
    #[serde(default)]
    pub flows: Vec<RawFlow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFlow {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub page_urls: Vec<String>,
}

impl ClassifierResponse {
    /// Missing nav urls fall back to the summary's heuristic; unnamed flows
    /// are numbered from 1.
    pub fn into_classification(self, summary: &FlowSummary) -> Classification {
        let global_nav_urls = self
            .global_nav_urls
            .unwrap_or_else(|| summary.global_nav_heuristic.clone());
        let flows = self
            .flows
            .into_iter()
            .enumerate()
            .map(|(i, raw)| Flow {
                id: raw.id.unwrap_or_else(|| format!("flow-{}", i + 1)),
                title: raw.title.unwrap_or_else(|| format!("Flow {}", i + 1)),
                description: raw.description,
                page_urls: raw.page_urls,
            })
            .collect();
        Classification::Classified {
            global_nav_urls,
            flows,
        }
    }
}

#[async_trait]
pub trait FlowClassifier: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(&self, summary: &FlowSummary) -> Result<ClassifierResponse>;
}

/// Run `classifier` (if any) over `summary`, folding every failure into
/// [`Classification::Error`].
pub async fn run_classifier(
    classifier: Option<&dyn FlowClassifier>,
    summary: &FlowSummary,
) -> Classification {
    let Some(classifier) = classifier else {
        info!("No flow classifier configured, using heuristics only");
        return Classification::Unavailable;
    };

    if summary.pages.is_empty() || summary.edges.is_empty() {
        debug!("Nothing to classify");
        return Classification::Classified {
            global_nav_urls: Vec::new(),
            flows: Vec::new(),
        };
    }

    info!(
        "Classifying {} pages and {} edges with {}",
        summary.pages.len(),
        summary.edges.len(),
        classifier.name()
    );
    match classifier.classify(summary).await {
        Ok(response) => response.into_classification(summary),
        Err(e) => {
            warn!("Flow classification failed: {}", e);
            Classification::Error(e.to_string())
        }
    }
}

const SYSTEM_PROMPT: &str = "You analyze website navigation. Given the pages and links of a crawl, \
identify the links that appear on most pages as global navigation (home, login, footer links) \
and extract the distinct user journeys through the rest of the site, each with a short \
descriptive title. Reply with valid JSON only, no markdown.";

fn compact_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| ClassifyError::Parse(format!("Failed to serialize summary: {}", e)))
}

/// User prompt embedding `summary` as compact JSON.
pub fn user_prompt(summary: &FlowSummary) -> Result<String> {
    let pages = compact_json(&summary.pages)?;
    let edges = compact_json(&summary.edges)?;
    let nav = compact_json(&summary.global_nav_heuristic)?;
    let base = summary.base_url.as_deref().unwrap_or("(same origin)");

    Ok(format!(
        "Extract the user flows of this website crawl.\n\
         Base URL: {base} (all paths below are relative to it)\n\
         \n\
         PAGES ({page_count}):\n{pages}\n\
         \n\
         LINK GRAPH (edges):\n{edges}\n\
         \n\
         HEURISTIC: paths linked from many pages, likely global navigation:\n{nav}\n\
         \n\
         1. Decide which paths are global navigation, starting from the heuristic list.\n\
         2. Extract 3-8 user flows, each an ordered list of paths forming one journey.\n\
         3. Title each flow in 2-5 words.\n\
         \n\
         Answer with exactly this JSON shape, using paths such as \"/pricing\" rather than full URLs:\n\
         {{\"globalNavUrls\": [\"/path\"], \"flows\": [{{\"id\": \"flow-1\", \"title\": \"Flow title\", \
         \"description\": \"Short description\", \"pageUrls\": [\"/a\", \"/b\"]}}]}}",
        page_count = summary.pages.len(),
    ))
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    #[serde(default)]
    choices: Vec<ChoiceRaw>,
}

#[derive(Debug, Deserialize)]
struct ChoiceRaw {
    message: MessageRaw,
}

#[derive(Debug, Deserialize)]
struct MessageRaw {
    content: Option<String>,
}

/// Groq chat completions client.
#[derive(Clone)]
pub struct GroqClassifier {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GroqClassifier {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClassifyError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: DEFAULT_GROQ_BASE_URL.to_string(),
            model: DEFAULT_GROQ_MODEL.to_string(),
        })
    }

    /// Configure from `GROQ_API_KEY`, `GROQ_MODEL` and `GROQ_BASE_URL`. A
    /// missing or blank key means no classifier.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_vars(
            std::env::var("GROQ_API_KEY").ok(),
            std::env::var("GROQ_MODEL").ok(),
            std::env::var("GROQ_BASE_URL").ok(),
        )
    }

    pub fn from_vars(
        api_key: Option<String>,
        model: Option<String>,
        base_url: Option<String>,
    ) -> Result<Option<Self>> {
        let Some(api_key) = api_key.filter(|k| !k.trim().is_empty()) else {
            return Ok(None);
        };

        let mut classifier = Self::new(api_key.trim())?;
        if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
            classifier = classifier.with_model(model.trim());
        }
        if let Some(base_url) = base_url.filter(|u| !u.trim().is_empty()) {
            url::Url::parse(base_url.trim())
                .map_err(|e| ClassifyError::Config(format!("Invalid GROQ_BASE_URL: {}", e)))?;
            classifier = classifier.with_base_url(base_url.trim());
        }
        Ok(Some(classifier))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl FlowClassifier for GroqClassifier {
    fn name(&self) -> &str {
        &self.model
    }

    async fn classify(&self, summary: &FlowSummary) -> Result<ClassifierResponse> {
        let start = std::time::Instant::now();
        let user = user_prompt(summary)?;
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: TEMPERATURE,
        };
        debug!("Classifier prompt:\n{}", user);

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Classifier request failed");
                ClassifyError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Classifier API error");
            return Err(ClassifyError::Api(format!("{}: {}", status, error_text)));
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| ClassifyError::Parse(e.to_string()))?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ClassifyError::EmptyResponse)?;

        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis(),
            "Classifier completion"
        );

        serde_json::from_str(&content)
            .map_err(|e| ClassifyError::Parse(format!("Classifier returned invalid JSON: {}", e)))
    }
}
