//! Fallback translation backend: a LibreTranslate-style endpoint.

use std::time::Duration;

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

use crate::{
    Translator,
    error::{Error, Result},
    lang::norm_lang,
};

pub struct LibreTranslator {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct LibreRequest<'a> {
    q: &'a str,
    source: &'static str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct LibreResponse {
    #[serde(rename = "translatedText", default)]
    translated_text: Option<String>,
    /// Some deployments use this key instead.
    #[serde(default)]
    translation: Option<String>,
}

impl LibreTranslator {
    pub fn new(url: String, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key,
            timeout,
        }
    }
}

#[async_trait]
impl Translator for LibreTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String> {
        let body = LibreRequest {
            q: text,
            source: "auto",
            target: norm_lang(target_lang),
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let resp = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<LibreResponse>()
            .await?;

        let out = resp
            .translated_text
            .or(resp.translation)
            .map(|s| s.trim().to_owned())
            .unwrap_or_default();
        if out.is_empty() {
            return Err(Error::Empty);
        }
        Ok(out)
    }

    fn tag(&self) -> &'static str {
        "🆓"
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_translated_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/translate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"translatedText": "xin chào"}"#)
            .create_async()
            .await;

        let t = LibreTranslator::new(
            format!("{}/translate", server.url()),
            None,
            Duration::from_secs(5),
        );
        assert_eq!(t.translate("hello", "vi").await.unwrap(), "xin chào");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn accepts_translation_key_variant() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/translate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"translation": "halo"}"#)
            .create_async()
            .await;

        let t = LibreTranslator::new(
            format!("{}/translate", server.url()),
            None,
            Duration::from_secs(5),
        );
        assert_eq!(t.translate("hello", "id").await.unwrap(), "halo");
    }

    #[tokio::test]
    async fn empty_body_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/translate")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let t = LibreTranslator::new(
            format!("{}/translate", server.url()),
            None,
            Duration::from_secs(5),
        );
        assert!(t.translate("hello", "vi").await.is_err());
    }
}
