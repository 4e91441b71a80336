//! REST client for the relay.

use reqwest::StatusCode;

use crate::error::{ClientError, ClientResult};
use wire_schema::{
    AddContactRequest, AuthRequest, AuthResponse, ContactDto, ErrorResponse, LookupKeyRequest,
    LookupKeyResponse, MessageDto, RegisterKeyRequest,
};

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    fn bearer(&self) -> ClientResult<&str> {
        self.token
            .as_deref()
            .ok_or(ClientError::NotReady("not authenticated"))
    }

    async fn check(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        // Prefer the relay's structured error body when it parses.
        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// `POST /api/auth` — obtain and remember a bearer token.
    pub async fn authenticate(
        &mut self,
        username: &str,
        public_key: Option<&str>,
    ) -> ClientResult<()> {
        let body = AuthRequest {
            username: username.to_string(),
            public_key: public_key.map(str::to_string),
        };
        let response = self
            .http
            .post(self.url("/api/auth"))
            .json(&body)
            .send()
            .await?;
        let auth: AuthResponse = Self::check(response).await?.json().await?;
        self.token = Some(auth.token);
        Ok(())
    }

    /// `POST /api/publickeys`
    pub async fn register_public_key(&self, public_key: &str) -> ClientResult<()> {
        let response = self
            .http
            .post(self.url("/api/publickeys"))
            .bearer_auth(self.bearer()?)
            .json(&RegisterKeyRequest {
                public_key: public_key.to_string(),
            })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// `POST /api/getpublickey` — `Ok(None)` when the username is unknown,
    /// so a missing peer is distinguishable from a transport failure.
    pub async fn get_public_key(&self, username: &str) -> ClientResult<Option<String>> {
        let response = self
            .http
            .post(self.url("/api/getpublickey"))
            .bearer_auth(self.bearer()?)
            .json(&LookupKeyRequest {
                username: username.to_string(),
            })
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: LookupKeyResponse = Self::check(response).await?.json().await?;
        Ok(Some(body.public_key))
    }

    /// `GET /api/contacts`
    pub async fn contacts(&self) -> ClientResult<Vec<ContactDto>> {
        let response = self
            .http
            .get(self.url("/api/contacts"))
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// `GET /api/messages?with=X`
    pub async fn history(&self, with: &str) -> ClientResult<Vec<MessageDto>> {
        let response = self
            .http
            .get(self.url("/api/messages"))
            .query(&[("with", with)])
            .bearer_auth(self.bearer()?)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// `POST /api/contacts/add`
    pub async fn add_contact(&self, contact_username: &str) -> ClientResult<()> {
        let response = self
            .http
            .post(self.url("/api/contacts/add"))
            .bearer_auth(self.bearer()?)
            .json(&AddContactRequest {
                contact_username: contact_username.to_string(),
            })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
