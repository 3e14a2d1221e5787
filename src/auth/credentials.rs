use reqwest::Client;
use serde_json::Value;

use crate::error::SalesforceError;

const TOKEN_PATH: &str = "/services/oauth2/token";

/// How to obtain an access token for an environment.
#[derive(Clone, Debug)]
pub enum AuthConfig {
    /// OAuth username-password flow; `password` already has the security token appended.
    Password {
        login_url: String,
        client_id: String,
        client_secret: String,
        username: String,
        password: String,
    },
    /// OAuth client-credentials flow against a My Domain login URL.
    ClientCredentials {
        login_url: String,
        client_id: String,
        client_secret: String,
    },
}

/// An authenticated session.
#[derive(Clone, Debug)]
pub struct Session {
    pub access_token: String,
    pub instance_url: String,
}

impl AuthConfig {
    fn login_url(&self) -> &str {
        match self {
            AuthConfig::Password { login_url, .. } | AuthConfig::ClientCredentials { login_url, .. } => {
                login_url
            }
        }
    }

    fn form(&self) -> Vec<(&'static str, &str)> {
        match self {
            AuthConfig::Password {
                client_id,
                client_secret,
                username,
                password,
                ..
            } => vec![
                ("grant_type", "password"),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("username", username),
                ("password", password),
            ],
            AuthConfig::ClientCredentials {
                client_id,
                client_secret,
                ..
            } => vec![
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ],
        }
    }
}

/// Request an access token and the instance URL to use with it.
pub async fn login(auth: &AuthConfig) -> Result<Session, SalesforceError> {
    let client = Client::new();
    let token_url = format!("{}{}", auth.login_url().trim_end_matches('/'), TOKEN_PATH);

    let resp = client.post(&token_url).form(&auth.form()).send().await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SalesforceError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    let json: Value = resp.json().await?;

    let access_token = json
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or_else(|| SalesforceError::InvalidResponse("No access_token in response".to_string()))?;
    let instance_url = json
        .get("instance_url")
        .and_then(|v| v.as_str())
        .ok_or_else(|| SalesforceError::InvalidResponse("No instance_url in response".to_string()))?;

    if access_token.trim().is_empty() {
        return Err(SalesforceError::InvalidResponse(
            "Access token was empty".to_string(),
        ));
    }

    Ok(Session {
        access_token: access_token.to_string(),
        instance_url: instance_url.trim_end_matches('/').to_string(),
    })
}
