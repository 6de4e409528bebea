//! Seedr REST API client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use debridgate_common::{Error, Result, StoreName};

use super::types::{Account, FileInfo, FolderContents, SettingsResponse};

/// Seedr REST API base URL.
const API_BASE: &str = "https://www.seedr.cc/rest";

/// Backend operations the Seedr store needs.
///
/// Every call takes the account credential as `email:password`.
#[async_trait]
pub trait SeedrApi: Send + Sync {
    async fn get_root(&self, api_key: &str) -> Result<FolderContents>;

    async fn get_folder(&self, api_key: &str, folder_id: u64) -> Result<FolderContents>;

    async fn get_file(&self, api_key: &str, file_id: u64) -> Result<FileInfo>;

    async fn get_account(&self, api_key: &str) -> Result<Account>;
}

/// Split an `email:password` credential.
pub fn split_credential(api_key: &str) -> Result<(&str, &str)> {
    api_key
        .split_once(':')
        .filter(|(email, _)| !email.is_empty())
        .ok_or_else(|| Error::InvalidInput("Seedr credential must be email:password".to_string()))
}

/// reqwest implementation of [`SeedrApi`].
pub struct SeedrClient {
    http: Client,
    base_url: String,
}

impl SeedrClient {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            base_url: API_BASE.to_string(),
        }
    }

    /// Point the client at another API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get<T: DeserializeOwned>(&self, api_key: &str, path: &str) -> Result<T> {
        let (email, password) = split_credential(api_key)?;
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .get(&url)
            .basic_auth(email, Some(password))
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to get {}: {}", path, e)))?;

        self.handle_response(response).await
    }

    /// Handle API response with error checking.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| {
                Error::upstream(StoreName::Seedr, format!("Failed to parse response: {}", e))
            })
        } else if status == StatusCode::NOT_FOUND {
            Err(Error::NotFound("Resource not found".to_string()))
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(Error::upstream(
                StoreName::Seedr,
                format!("Access denied ({})", status),
            ))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::upstream(
                StoreName::Seedr,
                format!("API error: {} - {}", status, body),
            ))
        }
    }
}

#[async_trait]
impl SeedrApi for SeedrClient {
    async fn get_root(&self, api_key: &str) -> Result<FolderContents> {
        self.get(api_key, "/folder").await
    }

    async fn get_folder(&self, api_key: &str, folder_id: u64) -> Result<FolderContents> {
        self.get(api_key, &format!("/folder/{}", folder_id)).await
    }

    async fn get_file(&self, api_key: &str, file_id: u64) -> Result<FileInfo> {
        self.get(api_key, &format!("/file/{}", file_id)).await
    }

    async fn get_account(&self, api_key: &str) -> Result<Account> {
        let settings: SettingsResponse = self.get(api_key, "/settings").await?;
        if !settings.result {
            return Err(Error::upstream(StoreName::Seedr, "settings request failed"));
        }
        Ok(settings.settings.account)
    }
}
