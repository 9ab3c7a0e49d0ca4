//! Thin typed wrapper over the client-server HTTP API
//!
//! Every endpoint returns a `SessionResult`. Non-2xx responses are decoded
//! from the standard `{errcode, error}` body when the homeserver sends one.

use informant_core::{ContentUri, EventId, RoomId, SessionError, SessionResult};
use parking_lot::RwLock;
use reqwest::{header, Client, RequestBuilder, Url};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::sync::SyncResponse;

const CLIENT_PREFIX: [&str; 3] = ["_matrix", "client", "v3"];
const MEDIA_PREFIX: [&str; 3] = ["_matrix", "media", "v3"];

const USER_AGENT: &str = concat!("matrix-informant/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub user_id: String,
    pub access_token: String,
    pub device_id: String,
}

#[derive(Debug, Deserialize)]
pub struct WhoAmIResponse {
    pub user_id: String,
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    content_uri: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    event_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    errcode: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    #[serde(rename = "type")]
    login_type: &'static str,
    identifier: UserIdentifier<'a>,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_id: Option<&'a str>,
    initial_device_display_name: &'a str,
}

#[derive(Debug, Serialize)]
struct UserIdentifier<'a> {
    #[serde(rename = "type")]
    id_type: &'static str,
    user: &'a str,
}

/// HTTP client bound to one homeserver
pub struct ApiClient {
    http: Client,
    base: Url,
    token: RwLock<Option<String>>,
    request_timeout: Option<Duration>,
}

impl ApiClient {
    /// Create a client for `homeserver`
    pub fn new(homeserver: &str, request_timeout: Option<Duration>) -> SessionResult<Self> {
        let base = Url::parse(homeserver)
            .map_err(|e| SessionError::InvalidId(format!("homeserver URL {homeserver}: {e}")))?;

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base,
            token: RwLock::new(None),
            request_timeout,
        })
    }

    /// Use `token` for every following request
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// Password login, optionally reusing an existing device
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        device_id: Option<&str>,
        device_display_name: &str,
    ) -> SessionResult<LoginResponse> {
        let body = LoginRequest {
            login_type: "m.login.password",
            identifier: UserIdentifier {
                id_type: "m.id.user",
                user: username,
            },
            password,
            device_id,
            initial_device_display_name: device_display_name,
        };

        let url = self.client_url(&["login"])?;
        self.execute(self.http.post(url).json(&body), self.request_timeout)
            .await
    }

    /// Resolve the owner of the current access token
    pub async fn whoami(&self) -> SessionResult<WhoAmIResponse> {
        let url = self.client_url(&["account", "whoami"])?;
        self.execute(self.http.get(url), self.request_timeout).await
    }

    /// One long-poll sync request
    pub async fn sync(
        &self,
        since: Option<&str>,
        timeout: Duration,
        request_timeout: Duration,
    ) -> SessionResult<SyncResponse> {
        let mut url = self.client_url(&["sync"])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("timeout", &timeout.as_millis().to_string());
            if let Some(since) = since {
                query.append_pair("since", since);
            }
        }

        self.execute(self.http.get(url), Some(request_timeout)).await
    }

    /// Upload raw bytes to the media repository
    pub async fn upload(&self, data: &[u8], content_type: &str) -> SessionResult<ContentUri> {
        let url = self.media_url(&["upload"])?;
        let request = self
            .http
            .post(url)
            .header(header::CONTENT_TYPE, content_type)
            .body(data.to_vec());

        let response: UploadResponse = self.execute(request, self.request_timeout).await?;
        Ok(ContentUri::new(response.content_uri))
    }

    /// Send an `m.room.message` event
    pub async fn send_message(
        &self,
        room_id: &RoomId,
        txn_id: &str,
        content: &Value,
    ) -> SessionResult<EventId> {
        let url = self.client_url(&[
            "rooms",
            room_id.as_str(),
            "send",
            "m.room.message",
            txn_id,
        ])?;

        let response: SendResponse = self
            .execute(self.http.put(url).json(content), self.request_timeout)
            .await?;
        Ok(EventId::new(response.event_id))
    }

    /// Join a room by id
    pub async fn join(&self, room_id: &RoomId) -> SessionResult<()> {
        let url = self.client_url(&["join", room_id.as_str()])?;
        let _: IgnoredAny = self
            .execute(self.http.post(url).json(&json!({})), self.request_timeout)
            .await?;
        Ok(())
    }

    pub async fn set_display_name(&self, user_id: &str, name: &str) -> SessionResult<()> {
        let url = self.client_url(&["profile", user_id, "displayname"])?;
        let _: IgnoredAny = self
            .execute(
                self.http.put(url).json(&json!({ "displayname": name })),
                self.request_timeout,
            )
            .await?;
        Ok(())
    }

    pub async fn set_avatar_url(&self, user_id: &str, uri: &ContentUri) -> SessionResult<()> {
        let url = self.client_url(&["profile", user_id, "avatar_url"])?;
        let _: IgnoredAny = self
            .execute(
                self.http.put(url).json(&json!({ "avatar_url": uri.as_str() })),
                self.request_timeout,
            )
            .await?;
        Ok(())
    }

    fn client_url(&self, path: &[&str]) -> SessionResult<Url> {
        self.endpoint(&CLIENT_PREFIX, path)
    }

    fn media_url(&self, path: &[&str]) -> SessionResult<Url> {
        self.endpoint(&MEDIA_PREFIX, path)
    }

    fn endpoint(&self, prefix: &[&str], path: &[&str]) -> SessionResult<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                SessionError::InvalidId(format!("homeserver URL {} cannot be a base", self.base))
            })?;
            segments
                .pop_if_empty()
                .extend(prefix.iter().chain(path.iter()));
        }
        Ok(url)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        timeout: Option<Duration>,
    ) -> SessionResult<T> {
        let request = match timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        };
        let token = self.token.read().clone();
        let request = match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| SessionError::Decode(e.to_string()));
        }

        let body = response.bytes().await.unwrap_or_default();
        let error: ErrorBody = serde_json::from_slice(&body).unwrap_or_default();

        Err(SessionError::Api {
            status: status.as_u16(),
            errcode: error.errcode.unwrap_or_else(|| "M_UNKNOWN".to_string()),
            message: error.error.unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            }),
        })
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.base.as_str())
            .field("authenticated", &self.token.read().is_some())
            .finish_non_exhaustive()
    }
}

fn transport_error(err: reqwest::Error) -> SessionError {
    if err.is_timeout() {
        SessionError::Timeout
    } else {
        SessionError::Transport(err.to_string())
    }
}
