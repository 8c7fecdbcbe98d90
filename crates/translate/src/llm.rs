//! Primary translation backend: an LLM generateContent-style endpoint.

use std::time::Duration;

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::{
    Translator,
    error::{Error, Result},
    lang::lang_name,
};

/// Translates through a generateContent endpoint authenticated with an API
/// key header. A first attempt sends generation config tuned for faithful
/// output; if the endpoint rejects it, one retry goes out without it.
pub struct LlmTranslator {
    client: reqwest::Client,
    url: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "topP")]
    top_p: f32,
    response_mime_type: &'static str,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_k: 1,
            top_p: 0.9,
            response_mime_type: "text/markdown",
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl LlmTranslator {
    pub fn new(url: String, api_key: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key,
            timeout,
        }
    }

    async fn request(&self, prompt: &str, with_config: bool) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: with_config.then(GenerationConfig::default),
        };

        let resp = self
            .client
            .post(&self.url)
            .header("X-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<GenerateResponse>()
            .await?;

        let text = resp
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_owned())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(Error::Empty);
        }
        Ok(text)
    }
}

/// Prompt: translate into the target language, keep markdown exactly as-is.
fn build_prompt(target_name: &str, text: &str) -> String {
    format!(
        "Translate the text below into {target_name}. Do not add any explanations or extra words. \
         If the input contains Markdown, preserve its formatting EXACTLY as-is (headings, lists, \
         bold/italic, code blocks, tables, inline code, links, spacing, and line breaks). \
         If the input is not Markdown, output clear {target_name} with appropriate punctuation \
         and line breaks.\n\nINPUT:\n{text}\n\nOUTPUT ({target_name} only):"
    )
}

#[async_trait]
impl Translator for LlmTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        let prompt = build_prompt(lang_name(target_lang), text);
        match self.request(&prompt, true).await {
            Ok(out) => Ok(out),
            Err(e) => {
                // Some deployments reject the generation config; retry bare.
                debug!(error = %e, "generateContent with config failed, retrying without");
                self.request(&prompt, false).await
            },
        }
    }

    fn tag(&self) -> &'static str {
        "🔁"
    }
}
