//! Client for the bolls.life verse API.
//!
//! `GET {base}/{TRANSLATION}/{book_id}/{chapter}/{verse}/` answers with a JSON
//! object whose `text` field holds the verse with inline markup.

use anyhow::{Context, Result};
use log::debug;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

use super::text::sanitize;
use super::VerseTextProvider;
use crate::error::VerseError;
use crate::resolver::Reference;
use crate::translation::Translation;

pub const API_BASE: &str = "https://bolls.life/get-verse";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("verseclock/", env!("CARGO_PKG_VERSION"));

/// Short explanations for the log and the download status file
pub trait ReqwestErrorExt {
    fn to_user_friendly_message(&self) -> String;
}

impl ReqwestErrorExt for reqwest::Error {
    fn to_user_friendly_message(&self) -> String {
        if self.is_timeout() {
            "the verse server did not answer in time".to_string()
        } else if self.is_connect() || self.is_request() {
            "could not reach the verse server, check the network connection".to_string()
        } else if self.is_decode() {
            "unexpected response format from the verse server".to_string()
        } else {
            format!("request failed: {}", self)
        }
    }
}

pub struct BollsClient {
    http: Client,
    base_url: String,
}

impl BollsClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn verse_url(&self, reference: &Reference, translation: Translation) -> String {
        format!(
            "{}/{}/{}/{}/{}/",
            self.base_url,
            translation.code(),
            reference.book_id,
            reference.chapter,
            reference.verse
        )
    }
}

/// Pull the verse text out of a response body
fn text_from_payload(
    payload: &Value,
    reference: &Reference,
    translation: Translation,
) -> Result<String, VerseError> {
    payload
        .get("text")
        .and_then(Value::as_str)
        .map(sanitize)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| VerseError::NotFound(format!("{} ({})", reference, translation)))
}

impl VerseTextProvider for BollsClient {
    fn fetch(
        &mut self,
        reference: &Reference,
        translation: Translation,
    ) -> Result<String, VerseError> {
        let url = self.verse_url(reference, translation);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|e| VerseError::NetworkError(e.to_user_friendly_message()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(VerseError::NotFound(format!("{} ({})", reference, translation)));
        }
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(VerseError::NetworkError(format!("server answered {}", status)));
        }
        if !status.is_success() {
            return Err(VerseError::NotFound(format!(
                "{} ({}), server answered {}",
                reference, translation, status
            )));
        }

        let payload: Value = response
            .json()
            .map_err(|e| VerseError::NetworkError(e.to_user_friendly_message()))?;
        text_from_payload(&payload, reference, translation)
    }
}
