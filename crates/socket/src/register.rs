//! The registration flow: exchange a registration code for an access token.

use {
    serde::{Deserialize, Serialize},
    tracing::info,
};

use crate::error::{Error, Result};

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    reg_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    #[serde(default)]
    token: Option<String>,
}

/// POST the registration code to `<server_url>/register` and return the
/// token. No retry; a failed attempt must leave stored state untouched, so
/// persisting the credentials is the caller's move.
pub async fn register(client: &reqwest::Client, server_url: &str, reg_code: &str) -> Result<String> {
    let url = format!("{}/register", server_url.trim_end_matches('/'));
    let resp = client
        .post(&url)
        .json(&RegisterRequest { reg_code })
        .send()
        .await?
        .error_for_status()?
        .json::<RegisterResponse>()
        .await?;

    let token = resp
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or(Error::MissingToken)?;
    info!("registration succeeded");
    Ok(token)
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_token_on_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/register")
            .match_body(mockito::Matcher::Json(serde_json::json!({"reg_code": "1234"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"token": "abc"}"#)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let token = register(&client, &server.url(), "1234").await.unwrap();
        assert_eq!(token, "abc");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_response_is_missing_token() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/register")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let err = register(&client, &server.url(), "1234").await.unwrap_err();
        assert!(matches!(err, Error::MissingToken));
    }

    #[tokio::test]
    async fn blank_token_is_missing_token() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/register")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"token": "  "}"#)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let err = register(&client, &server.url(), "1234").await.unwrap_err();
        assert!(matches!(err, Error::MissingToken));
    }

    #[tokio::test]
    async fn http_failure_propagates() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/register")
            .with_status(403)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        assert!(matches!(
            register(&client, &server.url(), "1234").await,
            Err(Error::Http(_))
        ));
    }
}
