use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use ums_core::entities::MediaUser;
use ums_core::traits::{MediaUserDirectory, RepoResult};

use super::EmbyError;

/// Header carrying the Emby API key
const TOKEN_HEADER: &str = "X-Emby-Token";

/// User record as returned by `GET /Users`; unknown fields are ignored
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EmbyUser {
    id: String,
    name: String,
}

impl From<EmbyUser> for MediaUser {
    fn from(user: EmbyUser) -> Self {
        Self {
            id: user.id,
            name: user.name,
        }
    }
}

/// Read-only client for the Emby user list
#[derive(Debug, Clone)]
pub struct EmbyClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl EmbyClient {
    /// `base_url` is the server root, e.g. `http://emby:8096/emby`
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EmbyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(
        config: &ums_common::MediaServerConfig,
        timeout: Duration,
    ) -> Result<Self, EmbyError> {
        Self::new(config.url.clone(), config.api_key.clone(), timeout)
    }

    /// Fetch every user account on the server
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn get_users(&self) -> Result<Vec<MediaUser>, EmbyError> {
        let url = format!("{}/Users", self.base_url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .header(TOKEN_HEADER, &self.api_key)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let users: Vec<EmbyUser> = response.json().await?;
                debug!(count = users.len(), "Fetched media server users");
                Ok(users.into_iter().map(MediaUser::from).collect())
            }
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(EmbyError::ApiError {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

#[async_trait]
impl MediaUserDirectory for EmbyClient {
    async fn list_users(&self) -> RepoResult<Vec<MediaUser>> {
        Ok(self.get_users().await?)
    }
}
