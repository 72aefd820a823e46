//! Client for the development file server.
//!
//! * `GET /files/list`
//! * `GET /files/get?file_path=...`
//! * `POST /files/upsert`
//! * `POST /events/create`
use std::time::Duration;

use file_sync::{FetchError, RemoteFile};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

/// Event type posted after a file has been written, so other clients reload it.
pub const FILE_UPDATED: &str = "FILE_UPDATED";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum FileServerError {
    #[error("Request failed. url: {url}, cause: {cause}")]
    Request { url: String, cause: reqwest::Error },
    #[error("Unexpected status. url: {url}, status: {status}")]
    Status { url: String, status: StatusCode },
}

#[derive(serde::Deserialize)]
struct FileListResponse {
    file_list: Vec<RemoteFile>,
}

#[derive(serde::Deserialize)]
struct FileResponse {
    file: FileContent,
}

#[derive(serde::Deserialize)]
struct FileContent {
    text_content: String,
}

#[derive(serde::Serialize)]
struct UpsertRequest<'a> {
    file_path: &'a str,
    text_content: &'a str,
}

#[derive(serde::Serialize)]
struct CreateEventRequest<'a> {
    event_type: &'a str,
    file_path: &'a str,
}

pub struct FileServerClient {
    http: Client,
    base_url: String,
    /// Retries for event posting, content requests are not retried.
    event_retries: usize,
}

impl FileServerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url
                .into()
                .trim_end_matches('/')
                .to_string(),
            event_retries: 1,
        }
    }

    pub async fn list_files(&self) -> Result<Vec<RemoteFile>, FileServerError> {
        let url = format!("{}/files/list", self.base_url);
        let response = self
            .send(&url, 0, |http| http.get(&url))
            .await?;
        let response = Self::expect_success(&url, response)?;

        let file_list: FileListResponse = Self::json(&url, response).await?;
        Ok(file_list.file_list)
    }

    /// `None` if the server has no such file.
    pub async fn get_file(&self, file_path: &str) -> Result<Option<String>, FileServerError> {
        let url = format!("{}/files/get", self.base_url);
        let response = self
            .send(&url, 0, |http| {
                http.get(&url)
                    .query(&[("file_path", file_path)])
            })
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("File not found. file_path: {}", file_path);
            return Ok(None);
        }
        let response = Self::expect_success(&url, response)?;

        let file: FileResponse = Self::json(&url, response).await?;
        Ok(Some(file.file.text_content))
    }

    pub async fn upsert_file(&self, file_path: &str, text_content: &str) -> Result<(), FileServerError> {
        let url = format!("{}/files/upsert", self.base_url);
        let request = UpsertRequest {
            file_path,
            text_content,
        };
        let response = self
            .send(&url, 0, |http| http.post(&url).json(&request))
            .await?;
        Self::expect_success(&url, response)?;

        Ok(())
    }

    pub async fn create_event(&self, event_type: &str, file_path: &str) -> Result<(), FileServerError> {
        let url = format!("{}/events/create", self.base_url);
        let request = CreateEventRequest {
            event_type,
            file_path,
        };
        let response = self
            .send(&url, self.event_retries, |http| http.post(&url).json(&request))
            .await?;
        Self::expect_success(&url, response)?;

        Ok(())
    }

    /// Fetch the content of a listed file, for use with [`file_sync::reconcile_files`].
    pub async fn fetch(&self, file: &RemoteFile) -> Result<String, FetchError> {
        match self.get_file(&file.file_path).await {
            Ok(Some(content)) => Ok(content),
            Ok(None) => Err(FetchError::NotFound(file.file_path.clone())),
            Err(error) => Err(FetchError::Request {
                file_path: file.file_path.clone(),
                reason: error.to_string(),
            }),
        }
    }

    /// Connection failures and server errors are retried up to `retries` times.
    async fn send(
        &self,
        url: &str,
        retries: usize,
        build: impl Fn(&Client) -> RequestBuilder,
    ) -> Result<Response, FileServerError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let can_retry = attempt <= retries;

            match build(&self.http)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await
            {
                Ok(response) if response.status().is_server_error() && can_retry => {
                    warn!("Retrying request. url: {}, status: {}", url, response.status());
                }
                Ok(response) => return Ok(response),
                Err(cause) if can_retry => {
                    warn!("Retrying request. url: {}, cause: {}", url, cause);
                }
                Err(cause) => {
                    return Err(FileServerError::Request {
                        url: url.to_string(),
                        cause,
                    })
                }
            }
        }
    }

    fn expect_success(url: &str, response: Response) -> Result<Response, FileServerError> {
        match response.status() {
            status if status.is_success() => Ok(response),
            status => Err(FileServerError::Status {
                url: url.to_string(),
                status,
            }),
        }
    }

    async fn json<T: serde::de::DeserializeOwned>(url: &str, response: Response) -> Result<T, FileServerError> {
        response
            .json()
            .await
            .map_err(|cause| FileServerError::Request {
                url: url.to_string(),
                cause,
            })
    }
}
