// ============================================================================
// deepsense-core/src/inference/hosted.rs
// ============================================================================
//
// HOSTED TEXT GENERATION: generateContent-style HTTP Backend
//
// The hosted model only ever answers in free-form text. For frame analysis
// it is asked to list the objects it expects at a given timestamp of the
// video, one per line, and the answer is mapped back to predictions:
//
//   "cat: 0.92"    -> cat, 0.92
//   "dog (87%)"    -> dog, 0.87
//   "person"       -> person, 1.0
//
// Lines that match none of these shapes are ignored.
//
// The same client also serves the ask feature (see crate::ask).

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;
use serde_json::{Value, json};

use crate::config::BackendConfig;
use crate::error::{CoreError, CoreResult};
use crate::processing::preprocess::Tensor;
use crate::utils::format_duration;

use super::{BackendKind, FrameContext, InferenceBackend, Prediction};

/// Blocking client for a generateContent-style text generation API.
#[derive(Debug, Clone)]
pub struct HostedTextClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HostedTextClient {
    pub fn new(config: &BackendConfig) -> CoreResult<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .map(|e| e.trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| CoreError::Config("backend.endpoint is required".into()))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| CoreError::Config(format!("Failed to build HTTP client: {e}")))?;

        if config.api_key.is_none() {
            log::warn!("No API key configured for {}; requests are sent unauthenticated", endpoint);
        }

        Ok(Self {
            http,
            endpoint,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// `{endpoint}/models/{model}:generateContent`
    pub fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    /// Sends `prompt` and returns the text of the first candidate.
    pub fn generate(&self, prompt: &str) -> CoreResult<String> {
        let url = self.url();
        log::debug!("POST {} ({} prompt chars)", url, prompt.len());

        let mut request = self.http.post(&url).json(&request_body(prompt));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let body: Value = request
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json())
            .map_err(|e| CoreError::Inference(format!("hosted model request failed: {e}")))?;

        extract_text(&body).ok_or_else(|| {
            CoreError::Inference("hosted model response contained no text".to_string())
        })
    }
}

/// Request body carrying a single text part.
pub fn request_body(prompt: &str) -> Value {
    json!({ "contents": [{ "parts": [{ "text": prompt }] }] })
}

/// Text of the first candidate's parts, concatenated.
pub fn extract_text(body: &Value) -> Option<String> {
    let parts = body
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() { None } else { Some(text) }
}

/// Longest bare line still read as a label rather than a sentence.
const MAX_BARE_LABEL_WORDS: usize = 4;

/// Line shapes recognized in a free-form answer.
struct AnswerGrammar {
    bullet: Regex,
    label_colon: Regex,
    label_paren: Regex,
    bare_label: Regex,
}

impl AnswerGrammar {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            bullet: Regex::new(r"^\s*(?:[-*\u{2022}]|\d+[.)])\s*")?,
            label_colon: Regex::new(
                r"^(?P<label>[^:()]+?)\s*:\s*(?P<value>\d+(?:\.\d+)?)\s*(?P<pct>%)?$",
            )?,
            label_paren: Regex::new(
                r"^(?P<label>[^:()]+?)\s*\(\s*(?P<value>\d+(?:\.\d+)?)\s*(?P<pct>%)?\s*\)$",
            )?,
            bare_label: Regex::new(r"^[A-Za-z][A-Za-z '\-]*$")?,
        })
    }

    fn parse_line(&self, line: &str) -> Option<Prediction> {
        let line = self.bullet.replace(line, "");
        let line = line.trim().trim_matches('*').trim();
        if line.is_empty() {
            return None;
        }

        let captures = self
            .label_colon
            .captures(line)
            .or_else(|| self.label_paren.captures(line));
        if let Some(caps) = captures {
            let label = caps.name("label")?.as_str().trim();
            let raw = caps.name("value")?.as_str();
            let mut value: f32 = raw.parse().ok()?;
            // Whole numbers up to 100 are read as percentages even without '%'
            let whole_percent = !raw.contains('.') && value > 1.0 && value <= 100.0;
            if caps.name("pct").is_some() || whole_percent {
                value /= 100.0;
            }
            if label.is_empty() || !(0.0..=1.0).contains(&value) {
                return None;
            }
            return Some(Prediction::new(label, value));
        }

        if self.bare_label.is_match(line)
            && line.split_whitespace().count() <= MAX_BARE_LABEL_WORDS
        {
            return Some(Prediction::new(line, 1.0));
        }
        None
    }
}

static GRAMMAR: Lazy<Result<AnswerGrammar, regex::Error>> = Lazy::new(AnswerGrammar::new);

/// Maps a free-form answer to predictions, one per recognized line.
pub fn parse_predictions(text: &str) -> Vec<Prediction> {
    match &*GRAMMAR {
        Ok(grammar) => text.lines().filter_map(|line| grammar.parse_line(line)).collect(),
        Err(e) => {
            log::error!("Answer grammar failed to compile: {}", e);
            Vec::new()
        }
    }
}

/// Prompt asking for the objects of one frame.
pub fn frame_prompt(context: &FrameContext<'_>) -> String {
    format!(
        "List the objects visible in the video {} at {} (frame {}). \
         Answer with one object per line formatted as `label: confidence`, \
         confidence between 0 and 1.",
        context.reference,
        format_duration(context.timestamp_secs),
        context.index
    )
}

/// `InferenceBackend` backed by a hosted text-generation model.
pub struct HostedTextBackend {
    client: HostedTextClient,
}

impl HostedTextBackend {
    pub fn new(client: HostedTextClient) -> Self {
        Self { client }
    }

    pub fn load(config: &BackendConfig) -> CoreResult<Self> {
        let client = HostedTextClient::new(config)?;
        log::info!("Using hosted model {} at {}", config.model, client.url());
        Ok(Self::new(client))
    }
}

impl InferenceBackend for HostedTextBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::TextGeneration
    }

    fn input_size(&self) -> Option<u32> {
        None
    }

    fn predict(&self, _tensor: &Tensor, context: &FrameContext<'_>) -> CoreResult<Vec<Prediction>> {
        let answer = self.client.generate(&frame_prompt(context))?;
        let predictions = parse_predictions(&answer);
        log::debug!(
            "Frame {}: hosted answer mapped to {} predictions",
            context.index,
            predictions.len()
        );
        Ok(predictions)
    }
}
