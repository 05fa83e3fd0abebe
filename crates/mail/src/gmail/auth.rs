//! Gmail OAuth2 authentication
//!
//! Implements the installed-app authorization code flow. A loopback listener on
//! an ephemeral port receives the OAuth redirect.
//! Uses synchronous HTTP (ureq); there is no retry on any step.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::Deserialize;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;

use super::token::{StoredToken, TokenStore};
use crate::config::GmailCredentials;

/// OAuth2 client configuration and token management for Gmail
pub struct GmailAuth {
    credentials: GmailCredentials,
    store: TokenStore,
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    #[allow(dead_code)]
    token_type: String,
}

impl From<TokenResponse> for StoredToken {
    fn from(token: TokenResponse) -> Self {
        StoredToken::issued_now(token.access_token, token.refresh_token, token.expires_in)
    }
}

impl GmailAuth {
    /// Gmail API OAuth2 endpoints
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Read, list and change labels; nothing broader is needed
    const GMAIL_MODIFY_SCOPE: &'static str = "https://www.googleapis.com/auth/gmail.modify";

    pub fn new(credentials: GmailCredentials, store: TokenStore) -> Self {
        Self { credentials, store }
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.store
    }

    /// Get a valid access token, refreshing or re-authenticating as needed
    pub fn get_access_token(&self) -> Result<String> {
        Ok(self.token()?.access_token)
    }

    /// Get a valid token including its expiry
    ///
    /// Order: fresh cached token, then refresh grant, then the interactive
    /// flow. The interactive flow only runs when there is no cache file or
    /// the cached token has no refresh token; an unreadable cache or a failed
    /// refresh is returned as an error. Any newly issued token is written back
    /// to the cache.
    pub fn token(&self) -> Result<StoredToken> {
        if let Some(token) = self.store.load()? {
            if token.is_fresh() {
                debug!("Using cached access token");
                return Ok(token);
            }

            if let Some(refresh_token) = token.refresh_token.as_deref() {
                let fresh = self.refresh_access_token(refresh_token)?;
                info!("Refreshed Gmail access token");
                self.store.save(&fresh)?;
                return Ok(fresh);
            }

            info!("Cached token expired and has no refresh token");
        }

        self.login()
    }

    /// Run the interactive flow unconditionally and cache the result
    pub fn login(&self) -> Result<StoredToken> {
        let token: StoredToken = self.authorization_code_auth()?.into();
        self.store.save(&token)?;
        Ok(token)
    }

    /// Perform authorization code flow authentication
    fn authorization_code_auth(&self) -> Result<TokenResponse> {
        // Any free port; Google accepts arbitrary loopback ports for installed apps
        let listener =
            TcpListener::bind("127.0.0.1:0").context("Failed to start local OAuth listener")?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://localhost:{}", port);

        let auth_url = self.authorization_url(&redirect_uri);

        println!("\n=== Gmail Authentication Required ===");
        println!("Opening browser for authentication...");
        println!("If the browser doesn't open, visit: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            eprintln!("Failed to open browser: {}. Please open the URL manually.", e);
        }

        println!("Waiting for authorization...");
        let code = wait_for_callback(listener)?;

        println!("Exchanging authorization code for tokens...");
        let mut response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("code", code.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .context("Failed to exchange authorization code")?;

        let token: TokenResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse token response")?;

        println!("Authentication successful!\n");
        Ok(token)
    }

    fn authorization_url(&self, redirect_uri: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            Self::AUTH_URL,
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(Self::GMAIL_MODIFY_SCOPE),
        )
    }

    /// Exchange a refresh token for a new access token
    fn refresh_access_token(&self, refresh_token: &str) -> Result<StoredToken> {
        let response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .context("Failed to refresh access token")?;

        let mut token: TokenResponse = response
            .into_body()
            .read_json()
            .context("Failed to parse refresh token response")?;

        // Google omits the refresh token on refresh grants
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }

        Ok(token.into())
    }

    /// Whether a usable token exists without prompting the user
    pub fn is_authenticated(&self) -> bool {
        match self.store.load() {
            Ok(Some(token)) if token.is_fresh() => true,
            Ok(Some(token)) => token
                .refresh_token
                .as_deref()
                .and_then(|refresh| self.refresh_access_token(refresh).ok())
                .is_some_and(|fresh| self.store.save(&fresh).is_ok()),
            _ => false,
        }
    }

    /// Clear stored tokens
    pub fn logout(&self) -> Result<()> {
        self.store.clear()
    }
}

/// Accept the OAuth redirect and extract the authorization code
fn wait_for_callback(listener: TcpListener) -> Result<String> {
    let (mut stream, _) = listener.accept().context("Failed to accept connection")?;

    let mut reader = BufReader::new(&stream);
    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .context("Failed to read request")?;

    let code = query_param(&request_line, "code");
    let error = query_param(&request_line, "error");

    let (status, body) = if code.is_some() {
        ("200 OK", "Authentication successful! You can close this window.")
    } else {
        ("400 Bad Request", "Authentication failed. Please try again.")
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body><h1>{}</h1></body></html>",
        status, body
    );
    stream.write_all(response.as_bytes()).ok();

    if let Some(err) = error {
        anyhow::bail!("OAuth error: {}", err);
    }

    code.context("No authorization code received")
}

/// Pull a decoded query parameter out of an HTTP request line
///
/// Format: `GET /?code=AUTH_CODE&scope=... HTTP/1.1`
fn query_param(request_line: &str, key: &str) -> Option<String> {
    let path = request_line.split_whitespace().nth(1)?;
    let query = path.split_once('?')?.1;
    query.split('&').find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name != key {
            return None;
        }
        urlencoding::decode(value).ok().map(|v| v.into_owned())
    })
}
