//! Gmail API HTTP client
//!
//! Implements [`MailService`] over the Gmail REST API.
//! Uses synchronous HTTP (ureq), one request at a time, no retry.

use anyhow::{Context, Result};
use log::debug;
use serde::de::DeserializeOwned;
use std::sync::{Mutex, PoisonError};

use super::GmailAuth;
use super::api::{
    GmailLabel, GmailMessage, ListLabelsResponse, ListMessagesResponse, MessageRef,
    ModifyMessageRequest,
};
use super::token::StoredToken;
use crate::models::MessageId;
use crate::service::MailService;

/// Non-success HTTP status from the Gmail API
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Gmail {endpoint} request failed with HTTP {code}")]
    Status { code: u16, endpoint: &'static str },
}

/// Gmail API client bound to one user
pub struct GmailClient {
    auth: GmailAuth,
    user_id: String,
    token: Mutex<Option<StoredToken>>,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Largest page `messages.list` will return
    const MAX_PAGE_SIZE: usize = 500;

    /// Authenticate and return a ready client
    ///
    /// Authentication happens once, here; a failure is returned to the caller
    /// and nothing is listed.
    pub fn connect(auth: GmailAuth, user_id: impl Into<String>) -> Result<Self> {
        let token = auth.token().context("Gmail authentication failed")?;
        Ok(Self {
            auth,
            user_id: user_id.into(),
            token: Mutex::new(Some(token)),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Current access token, going back to the authenticator once it expires
    fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = cached.as_ref()
            && token.is_fresh()
        {
            return Ok(token.access_token.clone());
        }

        debug!("Access token expired, re-authenticating");
        let token = self.auth.token()?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    fn user_url(&self) -> String {
        format!(
            "{}/users/{}",
            Self::BASE_URL,
            urlencoding::encode(&self.user_id)
        )
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, endpoint: &'static str) -> Result<T> {
        let access_token = self.access_token()?;

        let mut response = ureq::get(url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .map_err(|e| request_error(e, endpoint))?;

        response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse {} response", endpoint))
    }

    /// Fetch one page of message IDs matching every label
    pub fn list_messages(
        &self,
        label_ids: &[String],
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse> {
        let url = list_url(&self.user_url(), label_ids, max_results, page_token);
        self.get_json(&url, "list messages")
    }

    /// List labels so users can find IDs for the add-label action
    pub fn list_labels(&self) -> Result<Vec<GmailLabel>> {
        let url = format!("{}/labels", self.user_url());
        let labels: ListLabelsResponse = self.get_json(&url, "list labels")?;
        Ok(labels.labels.unwrap_or_default())
    }
}

impl MailService for GmailClient {
    /// Lists every page unless `max_messages` is reached first
    fn list_unread(
        &self,
        label_ids: &[String],
        max_messages: Option<usize>,
    ) -> Result<Vec<MessageRef>> {
        let mut all_messages: Vec<MessageRef> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let Some(page_size) = next_page_size(all_messages.len(), max_messages) else {
                break;
            };

            let response = self.list_messages(label_ids, page_size, page_token.as_deref())?;
            if let Some(messages) = response.messages {
                all_messages.extend(messages);
            }

            debug!("Listed {} messages so far", all_messages.len());

            match response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        if let Some(max) = max_messages {
            all_messages.truncate(max);
        }

        Ok(all_messages)
    }

    fn get_message(&self, id: &MessageId) -> Result<GmailMessage> {
        let url = format!(
            "{}/messages/{}?format=metadata&metadataHeaders=From",
            self.user_url(),
            urlencoding::encode(id.as_str())
        );
        self.get_json(&url, "get message")
            .with_context(|| format!("Failed to fetch message {}", id))
    }

    fn modify_message(&self, id: &MessageId, changes: &ModifyMessageRequest) -> Result<()> {
        let access_token = self.access_token()?;
        let url = format!(
            "{}/messages/{}/modify",
            self.user_url(),
            urlencoding::encode(id.as_str())
        );

        ureq::post(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .send_json(changes)
            .map_err(|e| request_error(e, "modify message"))
            .with_context(|| format!("Failed to modify message {}", id))?;

        Ok(())
    }
}

/// Build a `messages.list` URL; each label is a repeated `labelIds` parameter
fn list_url(
    user_url: &str,
    label_ids: &[String],
    max_results: usize,
    page_token: Option<&str>,
) -> String {
    let mut url = format!(
        "{}/messages?maxResults={}",
        user_url,
        max_results.min(GmailClient::MAX_PAGE_SIZE)
    );

    for label in label_ids {
        url.push_str(&format!("&labelIds={}", urlencoding::encode(label)));
    }

    if let Some(token) = page_token {
        url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
    }

    url
}

/// Page size for the next list request, `None` once the cap is reached
fn next_page_size(collected: usize, max_messages: Option<usize>) -> Option<usize> {
    match max_messages {
        Some(max) if collected >= max => None,
        Some(max) => Some((max - collected).min(GmailClient::MAX_PAGE_SIZE)),
        None => Some(GmailClient::MAX_PAGE_SIZE),
    }
}

fn request_error(err: ureq::Error, endpoint: &'static str) -> anyhow::Error {
    match err {
        ureq::Error::StatusCode(code) => ApiError::Status { code, endpoint }.into(),
        other => anyhow::Error::new(other).context(format!("Failed to send {} request", endpoint)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

    #[test]
    fn test_list_url_repeats_label_ids() {
        let labels = vec!["INBOX".to_string(), "UNREAD".to_string()];
        assert_eq!(
            list_url(USER_URL, &labels, 100, None),
            "https://gmail.googleapis.com/gmail/v1/users/me/messages?maxResults=100&labelIds=INBOX&labelIds=UNREAD"
        );
    }

    #[test]
    fn test_list_url_clamps_and_pages() {
        let url = list_url(USER_URL, &[], 10_000, Some("tok/en"));
        assert!(url.contains("maxResults=500"));
        assert!(url.ends_with("&pageToken=tok%2Fen"));
    }

    #[test]
    fn test_next_page_size() {
        assert_eq!(next_page_size(0, None), Some(500));
        assert_eq!(next_page_size(1500, None), Some(500));
        assert_eq!(next_page_size(0, Some(20)), Some(20));
        assert_eq!(next_page_size(500, Some(700)), Some(200));
        assert_eq!(next_page_size(20, Some(20)), None);
    }

    #[test]
    fn test_status_error_is_typed() {
        let err = request_error(ureq::Error::StatusCode(404), "get message");
        match err.downcast_ref::<ApiError>() {
            Some(ApiError::Status { code, endpoint }) => {
                assert_eq!(*code, 404);
                assert_eq!(*endpoint, "get message");
            }
            None => panic!("expected ApiError, got {err:#}"),
        }
    }
}
