// SPDX-FileCopyrightText: 2026 Tidings Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Meta Graph API messages endpoint.
//!
//! [`GraphClient`] makes exactly one request per call; the outbound sender
//! owns the retry policy and wraps `send_message` with it.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use serde::Serialize;
use tidings_core::{SendRequest, TidingsError};
use tracing::debug;

use crate::types::{GraphErrorResponse, SendResponse};

const DEFAULT_BASE_URL: &str = "https://graph.facebook.com";

/// Client for `POST {base}/{version}/{phone_number_id}/messages`.
#[derive(Debug, Clone)]
pub struct GraphClient {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
    default_phone_number_id: Option<String>,
}

/// Wire body for the messages endpoint.
#[derive(Debug, Serialize)]
struct SendBody<'a> {
    messaging_product: &'static str,
    recipient_type: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    message_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a tidings_core::TextContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    template: Option<&'a serde_json::Value>,
}

impl GraphClient {
    /// Creates a Graph API client with a bearer token default header.
    pub fn new(
        access_token: &str,
        api_version: String,
        base_url: String,
        default_phone_number_id: Option<String>,
    ) -> Result<Self, TidingsError> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {access_token}");
        headers.insert(
            reqwest::header::AUTHORIZATION,
            HeaderValue::from_str(&bearer)
                .map_err(|e| TidingsError::Config(format!("invalid access token: {e}")))?,
        );
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TidingsError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url,
            api_version,
            default_phone_number_id,
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// The phone number id a send request resolves to.
    pub fn resolve_phone_number_id<'a>(&'a self, request: &'a SendRequest) -> Option<&'a str> {
        request
            .phone_number_id
            .as_deref()
            .or(self.default_phone_number_id.as_deref())
    }

    /// Send one message, one attempt. Returns the provider message id
    /// from `messages[0].id`.
    pub async fn send_message(&self, request: &SendRequest) -> Result<String, TidingsError> {
        let phone_number_id =
            self.resolve_phone_number_id(request)
                .ok_or_else(|| TidingsError::Provider {
                    message: "no phone number id on request and no default configured".to_string(),
                    source: None,
                })?;

        let body = SendBody {
            messaging_product: "whatsapp",
            recipient_type: "individual",
            to: &request.to,
            message_type: &request.message_type,
            text: request.text.as_ref(),
            template: request.template.as_ref(),
        };

        let url = format!(
            "{}/{}/{}/messages",
            self.base_url, self.api_version, phone_number_id
        );
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TidingsError::Provider {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, to = %request.to, "graph send response received");

        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let message = match serde_json::from_str::<GraphErrorResponse>(&text) {
                Ok(err) => err.error.message,
                Err(_) => format!("Graph API returned {status}: {text}"),
            };
            return Err(TidingsError::Provider {
                message,
                source: None,
            });
        }

        let parsed: SendResponse =
            serde_json::from_str(&text).map_err(|e| TidingsError::Provider {
                message: format!("failed to parse Graph API response: {e}"),
                source: Some(Box::new(e)),
            })?;
        parsed
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| TidingsError::Provider {
                message: "Graph API response carried no message id".to_string(),
                source: None,
            })
    }
}
