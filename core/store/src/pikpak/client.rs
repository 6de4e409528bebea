//! PikPak drive API client.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;

use debridgate_common::{Error, Result, StoreName};

use super::types::{
    AddUrlResponse, File, FileList, ListFilesParams, Task, TaskList, UserInfo, VipInfo,
    FILE_KIND_FILE, PHASE_COMPLETE, PHASE_ERROR, PHASE_RUNNING,
};

/// PikPak drive API base URL.
const DRIVE_API_BASE: &str = "https://api-drive.mypikpak.com/drive/v1";
/// PikPak user API base URL.
const USER_API_BASE: &str = "https://user.mypikpak.com/v1";

/// Backend operations the PikPak store needs.
///
/// Every call takes the account's access token.
#[async_trait]
pub trait PikPakApi: Send + Sync {
    /// List non-trashed files under a folder, narrowed by `params`.
    async fn list_files(&self, api_key: &str, params: &ListFilesParams) -> Result<FileList>;

    async fn get_file(&self, api_key: &str, file_id: &str) -> Result<File>;

    /// Start an offline download from a URL.
    async fn add_url(&self, api_key: &str, url: &str) -> Result<Task>;

    /// Recent offline tasks in running, error or complete phase.
    async fn list_tasks(&self, api_key: &str, limit: u32) -> Result<Vec<Task>>;

    /// Move files to the trash.
    async fn trash(&self, api_key: &str, ids: &[String]) -> Result<()>;

    async fn get_user(&self, api_key: &str) -> Result<UserInfo>;

    /// Subscription tier, e.g. `platinum`.
    async fn get_vip_type(&self, api_key: &str) -> Result<String>;
}

/// reqwest implementation of [`PikPakApi`].
pub struct PikPakClient {
    http: Client,
    drive_base: String,
    user_base: String,
}

impl PikPakClient {
    /// Create a client on top of a prepared transport.
    pub fn new(http: Client) -> Self {
        Self {
            http,
            drive_base: DRIVE_API_BASE.to_string(),
            user_base: USER_API_BASE.to_string(),
        }
    }

    /// Point the client at other API hosts.
    pub fn with_base_urls(
        mut self,
        drive_base: impl Into<String>,
        user_base: impl Into<String>,
    ) -> Self {
        self.drive_base = drive_base.into();
        self.user_base = user_base.into();
        self
    }

    fn filters(params: &ListFilesParams) -> String {
        let mut filters = serde_json::json!({
            "trashed": {"eq": false},
        });
        if params.completed_only {
            filters["phase"] = serde_json::json!({"eq": PHASE_COMPLETE});
        }
        if let Some(kind) = &params.kind {
            filters["kind"] = serde_json::json!({"eq": kind});
        }
        if let Some(mime_type) = &params.mime_type {
            filters["mime_type"] = serde_json::json!({"eq": mime_type});
        }
        filters.to_string()
    }

    /// Handle API response with error checking.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| {
                Error::upstream(StoreName::PikPak, format!("Failed to parse response: {}", e))
            })
        } else if status == StatusCode::NOT_FOUND {
            Err(Error::NotFound("Resource not found".to_string()))
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(Error::upstream(
                StoreName::PikPak,
                format!("Access denied ({})", status),
            ))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::upstream(
                StoreName::PikPak,
                format!("API error: {} - {}", status, body),
            ))
        }
    }
}

#[async_trait]
impl PikPakApi for PikPakClient {
    async fn list_files(&self, api_key: &str, params: &ListFilesParams) -> Result<FileList> {
        let url = format!("{}/files", self.drive_base);
        let limit = params.limit.to_string();
        let filters = Self::filters(params);

        let mut request = self
            .http
            .get(&url)
            .bearer_auth(api_key)
            .query(&[
                ("parent_id", params.parent_id.as_str()),
                ("limit", limit.as_str()),
                ("filters", filters.as_str()),
                ("with_audit", "true"),
            ]);

        if let Some(token) = &params.page_token {
            request = request.query(&[("page_token", token.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to list files: {}", e)))?;

        self.handle_response(response).await
    }

    async fn get_file(&self, api_key: &str, file_id: &str) -> Result<File> {
        let url = format!("{}/files/{}", self.drive_base, file_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(api_key)
            .query(&[("usage", "FETCH")])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to get file: {}", e)))?;

        self.handle_response(response).await
    }

    async fn add_url(&self, api_key: &str, link: &str) -> Result<Task> {
        let url = format!("{}/files", self.drive_base);

        let body = serde_json::json!({
            "kind": FILE_KIND_FILE,
            "upload_type": "UPLOAD_TYPE_URL",
            "url": {"url": link},
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to add url: {}", e)))?;

        let added: AddUrlResponse = self.handle_response(response).await?;
        Ok(added.task)
    }

    async fn list_tasks(&self, api_key: &str, limit: u32) -> Result<Vec<Task>> {
        let url = format!("{}/tasks", self.drive_base);
        let limit = limit.to_string();
        let filters = serde_json::json!({
            "phase": {"in": format!("{},{},{}", PHASE_RUNNING, PHASE_ERROR, PHASE_COMPLETE)},
        })
        .to_string();

        let response = self
            .http
            .get(&url)
            .bearer_auth(api_key)
            .query(&[
                ("type", "offline"),
                ("limit", limit.as_str()),
                ("filters", filters.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to list tasks: {}", e)))?;

        let list: TaskList = self.handle_response(response).await?;
        Ok(list.tasks)
    }

    async fn trash(&self, api_key: &str, ids: &[String]) -> Result<()> {
        let url = format!("{}/files:batchTrash", self.drive_base);

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&serde_json::json!({ "ids": ids }))
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to trash files: {}", e)))?;

        let _: serde_json::Value = self.handle_response(response).await?;
        Ok(())
    }

    async fn get_user(&self, api_key: &str) -> Result<UserInfo> {
        let url = format!("{}/user/me", self.user_base);

        let response = self
            .http
            .get(&url)
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to get user: {}", e)))?;

        self.handle_response(response).await
    }

    async fn get_vip_type(&self, api_key: &str) -> Result<String> {
        let url = format!("{}/privilege/vip", self.drive_base);

        let response = self
            .http
            .get(&url)
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to get vip info: {}", e)))?;

        let info: VipInfo = self.handle_response(response).await?;
        Ok(info.data.vip_type)
    }
}
