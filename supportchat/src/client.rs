use async_trait::async_trait;
use miette::{Context, IntoDiagnostic, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use shared::{
    AccessTokenRequest, AccessTokenResponse, ChatSetting, ContentRequest, Conversation,
    RatingRequest, RatingType, SupportApi, TransportError, UrlAccessRequest,
};
use tracing::{debug, warn};

use crate::APP_USER_AGENT;

const AUTHORIZATION_HEADER: &str = "x-authorization";

#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    identifier: String,
}

impl Client {
    pub fn new(base_url: &str, identifier: &str) -> Result<Self> {
        Self::build(base_url, identifier, HeaderMap::new())
    }

    /// A copy of this client that sends `access_token` on every request.
    pub fn with_access_token(&self, access_token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();

        let mut value = HeaderValue::from_str(access_token)
            .into_diagnostic()
            .wrap_err("Could not create header value")?;
        value.set_sensitive(true);

        headers.insert(AUTHORIZATION_HEADER, value);

        Self::build(&self.base_url, &self.identifier, headers)
    }

    fn build(base_url: &str, identifier: &str, headers: HeaderMap) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .default_headers(headers)
            .build()
            .into_diagnostic()
            .wrap_err("Could not build reqwest client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            identifier: identifier.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/spaces/{}{}", self.base_url, self.identifier, path)
    }

    pub async fn access_token(
        &self,
        fingerprint: &str,
    ) -> Result<AccessTokenResponse, TransportError> {
        let body = AccessTokenRequest {
            identifier: self.identifier.clone(),
            fingerprint: fingerprint.to_string(),
        };
        send_json(self.http.post(self.url("/access_tokens")).json(&body)).await
    }

    pub async fn chat_setting(&self) -> Result<ChatSetting, TransportError> {
        send_json(self.http.get(self.url("/chat_setting"))).await
    }
}

#[async_trait]
impl SupportApi for Client {
    async fn create_conversation(&self, content: &str) -> Result<Conversation, TransportError> {
        let body = ContentRequest {
            content: content.to_string(),
        };
        send_json(self.http.post(self.url("/conversations")).json(&body)).await
    }

    async fn get_conversation(&self, token: &str) -> Result<Conversation, TransportError> {
        send_json(self.http.get(self.url(&format!("/conversations/{token}")))).await
    }

    async fn reply_to_conversation(
        &self,
        token: &str,
        content: &str,
    ) -> Result<Conversation, TransportError> {
        let body = ContentRequest {
            content: content.to_string(),
        };
        send_json(
            self.http
                .post(self.url(&format!("/conversations/{token}/reply")))
                .json(&body),
        )
        .await
    }

    async fn rate_conversation(
        &self,
        token: &str,
        rating: RatingType,
    ) -> Result<Conversation, TransportError> {
        let body = RatingRequest {
            rating_type_id: rating,
        };
        send_json(
            self.http
                .patch(self.url(&format!("/conversations/{token}/rating")))
                .json(&body),
        )
        .await
    }

    async fn track_url_access(&self, token: &str, url: &str) -> Result<(), TransportError> {
        let body = UrlAccessRequest {
            url: url.to_string(),
        };
        send(
            self.http
                .post(self.url(&format!("/conversations/{token}/url_accesses")))
                .json(&body),
        )
        .await
        .map(|_| ())
    }
}

async fn send(request: RequestBuilder) -> Result<reqwest::Response, TransportError> {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    debug!(status = %status, url = %response.url(), "response received");

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(status = %status, body = %body, "request failed");

    Err(TransportError::from_response(status.as_u16(), &body))
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, TransportError> {
    let response = send(request).await?;

    response.json::<T>().await.map_err(transport_error)
}

fn transport_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_decode() {
        TransportError::Decode(error.to_string())
    } else {
        TransportError::Network(error.to_string())
    }
}
