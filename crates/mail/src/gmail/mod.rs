//! Gmail API integration
//!
//! This module provides:
//! - Token cache persistence
//! - OAuth2 authentication flow
//! - Gmail API client implementing [`crate::service::MailService`]

mod auth;
mod client;
mod token;

pub use auth::GmailAuth;
pub use client::{ApiError, GmailClient};
pub use token::{StoredToken, TokenStore};

/// Gmail API request and response types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Response from listing messages
    #[derive(Debug, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
        pub next_page_token: Option<String>,
        pub result_size_estimate: Option<u32>,
    }

    /// Reference to a message (just ID and thread ID)
    #[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageRef {
        pub id: String,
        #[serde(default)]
        pub thread_id: String,
    }

    /// Message as returned by `messages.get` in metadata format
    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        #[serde(default)]
        pub thread_id: String,
        pub label_ids: Option<Vec<String>>,
        pub payload: Option<MessagePayload>,
    }

    /// Message payload containing headers
    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePayload {
        pub headers: Option<Vec<Header>>,
        pub mime_type: Option<String>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    /// Body of `messages.modify`
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ModifyMessageRequest {
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub add_label_ids: Vec<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub remove_label_ids: Vec<String>,
    }

    impl ModifyMessageRequest {
        /// Label change that removes a single label (e.g. marking read)
        pub fn remove(label: impl Into<String>) -> Self {
            Self {
                add_label_ids: Vec::new(),
                remove_label_ids: vec![label.into()],
            }
        }

        /// Label change that adds a single label
        pub fn add(label: impl Into<String>) -> Self {
            Self {
                add_label_ids: vec![label.into()],
                remove_label_ids: Vec::new(),
            }
        }
    }

    /// Response from listing labels
    #[derive(Debug, Default, Deserialize)]
    pub struct ListLabelsResponse {
        pub labels: Option<Vec<GmailLabel>>,
    }

    /// A label as returned by `labels.list`
    #[derive(Debug, Clone, Deserialize)]
    pub struct GmailLabel {
        pub id: String,
        pub name: String,
        #[serde(rename = "type")]
        pub label_type: Option<String>,
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_empty_list_response() {
            let list: ListMessagesResponse = serde_json::from_str(r#"{"resultSizeEstimate": 0}"#).unwrap();
            assert!(list.messages.is_none());
            assert!(list.next_page_token.is_none());
        }

        #[test]
        fn test_parse_metadata_message() {
            let json = r#"{
                "id": "m1",
                "threadId": "t1",
                "labelIds": ["INBOX", "UNREAD"],
                "payload": {
                    "mimeType": "text/plain",
                    "headers": [{"name": "From", "value": "Ada <ada@example.com>"}]
                }
            }"#;
            let msg: GmailMessage = serde_json::from_str(json).unwrap();
            let headers = msg.payload.unwrap().headers.unwrap();
            assert_eq!(headers[0].value, "Ada <ada@example.com>");
        }

        #[test]
        fn test_modify_request_omits_empty_lists() {
            let body = serde_json::to_value(ModifyMessageRequest::remove("UNREAD")).unwrap();
            assert_eq!(body, serde_json::json!({"removeLabelIds": ["UNREAD"]}));
        }
    }
}
