//! Translation backends and the fallback chain.
//!
//! The chain tries the primary LLM endpoint first, then a
//! LibreTranslate-style endpoint. Successful output is tagged with the
//! backend that produced it; total failure yields an empty string so a
//! failed translation never surfaces as an error message in the log.

pub mod error;
pub mod lang;
pub mod libre;
pub mod llm;
pub mod markdown;

use std::time::Duration;

use {async_trait::async_trait, tracing::debug};

use parrot_config::schema::TranslateConfig;

pub use crate::error::{Error, Result};
use crate::{libre::LibreTranslator, llm::LlmTranslator, markdown::{repair_list_structure, strip_fences}};

/// One translation backend.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String>;

    /// Short marker prefixed to output so the log shows which backend
    /// produced a translation.
    fn tag(&self) -> &'static str;
}

/// Ordered fallback chain over [`Translator`] backends.
pub struct TranslationChain {
    backends: Vec<Box<dyn Translator>>,
    target_lang: String,
}

impl TranslationChain {
    pub fn new(backends: Vec<Box<dyn Translator>>, target_lang: impl Into<String>) -> Self {
        Self {
            backends,
            target_lang: target_lang.into(),
        }
    }

    /// Build the chain from config: primary LLM endpoint when both URL and
    /// key are configured, then the fallback endpoint when configured.
    pub fn from_config(cfg: &TranslateConfig) -> Self {
        let timeout = Duration::from_secs(cfg.timeout_secs);
        let mut backends: Vec<Box<dyn Translator>> = Vec::new();

        if let (Some(url), Some(key)) = (&cfg.api_url, &cfg.api_key) {
            backends.push(Box::new(LlmTranslator::new(
                url.clone(),
                key.clone(),
                timeout,
            )));
        }
        if let Some(url) = &cfg.fallback_url {
            backends.push(Box::new(LibreTranslator::new(
                url.clone(),
                cfg.fallback_api_key.clone(),
                timeout,
            )));
        }

        Self::new(backends, cfg.target_lang.clone())
    }

    /// Translate `text`, walking the chain until a backend succeeds.
    ///
    /// Returns an empty string for blank input or when every backend fails.
    pub async fn translate(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        for backend in &self.backends {
            match backend.translate(text, &self.target_lang).await {
                Ok(out) => {
                    let out = repair_list_structure(text, &strip_fences(&out));
                    return format!("{} {out}", backend.tag());
                },
                Err(e) => {
                    debug!(tag = backend.tag(), error = %e, "translation backend failed");
                },
            }
        }
        String::new()
    }
}
