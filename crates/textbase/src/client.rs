use std::{
    error::Error as _,
    ffi::OsStr,
    io,
    path::{Path, PathBuf},
};

use common::config::Endpoints;
use derive_more::{Display, Error};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{
    multipart::{Form, Part},
    Client, RequestBuilder, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::{
    archiver::DEFAULT_ARCHIVE_NAME,
    response::{BotSummary, Deployment, Envelope, UploadData},
};

/// Bot names are limited to lowercase ASCII letters, digits, hyphens and underscores.
static BOT_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_-]+$").expect("invalid regex string"));

/// Errors shared by every remote service request.
#[derive(Debug, Display, Error)]
pub(crate) enum RequestError {
    /// Connection problem, or a non-2xx response without an error payload.
    #[display(fmt = "request failed: {}", message)]
    TransportFailure {
        /// Human-readable failure description.
        message: String,
    },

    /// The service returned an error payload or a malformed success payload.
    #[display(fmt = "remote service rejected the request: {}", body)]
    RemoteRejected {
        /// Raw response body.
        body: String,
    },
}

impl From<reqwest::Error> for RequestError {
    fn from(error: reqwest::Error) -> Self {
        let mut message = error.to_string();
        let mut source = error.source();

        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        RequestError::TransportFailure { message }
    }
}

/// Bot archive upload errors.
#[derive(Debug, Display, Error)]
pub(crate) enum UploadError {
    /// Bot name contains unsupported characters.
    #[display(
        fmt = "invalid bot name '{}': only lowercase letters, digits, hyphens and underscores are allowed",
        name
    )]
    InvalidName {
        /// Rejected bot name.
        name: String,
    },

    /// Archive file cannot be opened for reading.
    #[display(fmt = "unable to read archive {}: {}", "path.display()", source)]
    ArchiveUnreadable {
        /// Archive path.
        path: PathBuf,

        /// Underlying IO error.
        source: io::Error,
    },

    /// Connection problem, or a non-2xx response without an error payload.
    #[display(fmt = "upload failed: {}", message)]
    TransportFailure {
        /// Human-readable failure description.
        message: String,
    },

    /// The service returned an error payload or a malformed success payload.
    #[display(fmt = "remote service rejected the upload: {}", body)]
    RemoteRejected {
        /// Raw response body.
        body: String,
    },

    /// Deployment summary does not follow the `"<status>. Bot ID: <id>. URL: <url>"` form.
    #[display(fmt = "unexpected deployment message: {}", message)]
    UnexpectedResponseShape {
        /// Raw deployment message.
        message: String,
    },
}

impl From<RequestError> for UploadError {
    fn from(error: RequestError) -> Self {
        match error {
            RequestError::TransportFailure { message } => UploadError::TransportFailure { message },
            RequestError::RemoteRejected { body } => UploadError::RemoteRejected { body },
        }
    }
}

/// JSON request body used to delete a bot.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest<'a> {
    /// Identifier of the bot to delete.
    bot_id: &'a str,
}

/// Check if `name` may be used as a bot name.
pub(crate) fn is_valid_bot_name(name: &str) -> bool {
    BOT_NAME_REGEX.is_match(name)
}

/// Remote deployment service client.
pub(crate) struct ApiClient {
    /// HTTP client.
    http: Client,

    /// Remote service endpoints.
    endpoints: Endpoints,
}

impl ApiClient {
    /// Create a new client for the provided endpoints.
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            http: Client::new(),
            endpoints,
        }
    }

    /// Upload a bot archive and parse the deployment summary.
    ///
    /// The bot name is validated before anything else, and an invalid name never
    /// reaches the network. The archive is streamed from disk in a single request,
    /// without retries.
    pub async fn deploy(
        &self,
        archive_path: &Path,
        bot_name: &str,
        api_key: &str,
    ) -> Result<Deployment, UploadError> {
        if !is_valid_bot_name(bot_name) {
            return Err(UploadError::InvalidName {
                name: bot_name.to_owned(),
            });
        }

        let unreadable = |source| UploadError::ArchiveUnreadable {
            path: archive_path.to_path_buf(),
            source,
        };

        let archive = tokio::fs::File::open(archive_path)
            .await
            .map_err(unreadable)?;
        let metadata = archive.metadata().await.map_err(unreadable)?;

        if !metadata.is_file() {
            return Err(unreadable(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }

        let file_name = archive_path
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or(DEFAULT_ARCHIVE_NAME)
            .to_owned();

        let part = Part::stream_with_length(archive, metadata.len())
            .file_name(file_name)
            .mime_str("application/zip")
            .map_err(RequestError::from)?;

        let form = Form::new()
            .text("botName", bot_name.to_owned())
            .part("file", part);

        debug!(url = %self.endpoints.upload_url, bot_name, "uploading archive");

        let (envelope, body) = self
            .send::<UploadData>(
                self.http
                    .post(&self.endpoints.upload_url)
                    .bearer_auth(api_key)
                    .multipart(form),
            )
            .await?;

        let Some(message) = require_data(envelope, body.clone())?.message else {
            return Err(UploadError::UnexpectedResponseShape { message: body });
        };

        let deployment = Deployment::parse(&message)
            .ok_or(UploadError::UnexpectedResponseShape { message })?;

        info!(bot_id = %deployment.bot_id, "bot deployed");

        Ok(deployment)
    }

    /// Retrieve the health status of a bot.
    pub async fn health(
        &self,
        bot_id: &str,
        api_key: &str,
    ) -> Result<Map<String, Value>, RequestError> {
        let url = self.route("bot-health");

        debug!(%url, bot_id, "checking bot health");

        let (envelope, body) = self
            .send(
                self.http
                    .get(url)
                    .query(&[("botId", bot_id)])
                    .bearer_auth(api_key),
            )
            .await?;

        require_data(envelope, body)
    }

    /// List bots owned by the API key holder.
    pub async fn list(&self, api_key: &str) -> Result<Vec<BotSummary>, RequestError> {
        let url = self.route("list");

        debug!(%url, "listing bots");

        let (envelope, _) = self
            .send::<Vec<BotSummary>>(self.http.get(url).bearer_auth(api_key))
            .await?;

        Ok(envelope.data.unwrap_or_default())
    }

    /// Delete a bot, returning the complete response object.
    pub async fn delete(
        &self,
        bot_id: &str,
        api_key: &str,
    ) -> Result<Map<String, Value>, RequestError> {
        let url = self.route("delete");

        debug!(%url, bot_id, "deleting bot");

        let (_, body) = self
            .send::<Value>(
                self.http
                    .post(url)
                    .bearer_auth(api_key)
                    .json(&DeleteRequest { bot_id }),
            )
            .await?;

        serde_json::from_str(&body).map_err(|_| RequestError::RemoteRejected { body })
    }

    /// Get the URL of a bot management route.
    fn route(&self, name: &str) -> String {
        format!("{}/{name}", self.endpoints.deploy_url.trim_end_matches('/'))
    }

    /// Send a request and unwrap the response envelope.
    ///
    /// Returns the parsed envelope along with the raw response body.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<(Envelope<T>, String), RequestError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!(%status, "received response");

        interpret(status, body)
    }
}

/// Classify a response by its status code and body.
fn interpret<T: DeserializeOwned>(
    status: StatusCode,
    body: String,
) -> Result<(Envelope<T>, String), RequestError> {
    if !status.is_success() {
        return match serde_json::from_str::<Envelope<Value>>(&body) {
            Ok(envelope) if envelope.has_error() => Err(RequestError::RemoteRejected { body }),
            _ => Err(RequestError::TransportFailure {
                message: format!("HTTP {status}: {body}"),
            }),
        };
    }

    match serde_json::from_str::<Envelope<T>>(&body) {
        Ok(envelope) if !envelope.has_error() => Ok((envelope, body)),
        _ => Err(RequestError::RemoteRejected { body }),
    }
}

/// Extract the `data` payload, treating its absence as a rejection.
fn require_data<T>(envelope: Envelope<T>, body: String) -> Result<T, RequestError> {
    envelope
        .data
        .ok_or(RequestError::RemoteRejected { body })
}

#[cfg(test)]
mod tests {
    use std::{
        net::TcpListener,
        sync::{Arc, Mutex},
    };

    use assert_json::assert_json;
    use axum::{
        extract::{Multipart, Query},
        http::HeaderMap,
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::testing::{endpoints, serve};

    /// Upload request as seen by the mock service.
    #[derive(Default, Debug)]
    struct CapturedUpload {
        /// `Authorization` header value.
        authorization: Option<String>,

        /// `botName` form field.
        bot_name: Option<String>,

        /// File name of the `file` form field.
        file_name: Option<String>,

        /// Contents of the `file` form field.
        file: Vec<u8>,
    }

    fn upload_router(captured: Arc<Mutex<CapturedUpload>>, response: Value) -> Router {
        Router::new().route(
            "/upload-file",
            post(move |headers: HeaderMap, mut multipart: Multipart| async move {
                let mut upload = CapturedUpload {
                    authorization: headers
                        .get("authorization")
                        .and_then(|value| value.to_str().ok())
                        .map(str::to_owned),
                    ..Default::default()
                };

                while let Some(field) = multipart.next_field().await.unwrap() {
                    let name = field.name().map(str::to_owned);

                    match name.as_deref() {
                        Some("botName") => upload.bot_name = Some(field.text().await.unwrap()),
                        Some("file") => {
                            upload.file_name = field.file_name().map(str::to_owned);
                            upload.file = field.bytes().await.unwrap().to_vec();
                        }
                        _ => {}
                    }
                }

                *captured.lock().unwrap() = upload;

                Json(response)
            }),
        )
    }

    fn create_archive(contents: &[u8]) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_ARCHIVE_NAME);
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn bot_name_validation() {
        for name in ["echo", "weather-bot", "bot_2", "123", "-_-"] {
            assert!(is_valid_bot_name(name), "{name}");
        }

        for name in ["", "Echo", "weather bot", "bot!", "bot.v2", "bøt", "bot\n"] {
            assert!(!is_valid_bot_name(name), "{name:?}");
        }
    }

    #[tokio::test]
    async fn deploy() {
        let captured = Arc::new(Mutex::new(CapturedUpload::default()));
        let base = serve(upload_router(
            captured.clone(),
            json!({
                "error": null,
                "data": { "message": "Deployed. Bot ID: abc123. URL: https://x/y" }
            }),
        ))
        .await;
        let (_dir, archive) = create_archive(b"PK\x05\x06 archive bytes");

        let deployment = ApiClient::new(endpoints(&base))
            .deploy(&archive, "echo-bot", "secret-key")
            .await
            .expect("unable to deploy");

        assert_eq!(
            deployment,
            Deployment {
                status: String::from("Deployed"),
                bot_id: String::from("abc123"),
                url: String::from("https://x/y"),
            }
        );

        let upload = captured.lock().unwrap();
        assert_eq!(upload.authorization.as_deref(), Some("Bearer secret-key"));
        assert_eq!(upload.bot_name.as_deref(), Some("echo-bot"));
        assert_eq!(upload.file_name.as_deref(), Some(DEFAULT_ARCHIVE_NAME));
        assert_eq!(upload.file, b"PK\x05\x06 archive bytes");
    }

    #[tokio::test]
    async fn deploy_invalid_name_skips_network() {
        let (_dir, archive) = create_archive(b"zip");

        let result = ApiClient::new(endpoints("http://127.0.0.1:9"))
            .deploy(&archive, "Echo Bot", "secret-key")
            .await;

        assert!(matches!(result, Err(UploadError::InvalidName { name }) if name == "Echo Bot"));
    }

    #[tokio::test]
    async fn deploy_missing_archive() {
        let dir = TempDir::new().unwrap();

        let result = ApiClient::new(endpoints("http://127.0.0.1:9"))
            .deploy(&dir.path().join("missing.zip"), "echo", "secret-key")
            .await;

        assert!(matches!(result, Err(UploadError::ArchiveUnreadable { .. })));
    }

    #[tokio::test]
    async fn deploy_directory_as_archive() {
        let dir = TempDir::new().unwrap();

        let result = ApiClient::new(endpoints("http://127.0.0.1:9"))
            .deploy(dir.path(), "echo", "secret-key")
            .await;

        assert!(matches!(result, Err(UploadError::ArchiveUnreadable { .. })));
    }

    #[tokio::test]
    async fn deploy_rejected() {
        let base = serve(upload_router(
            Arc::default(),
            json!({
                "error": "Bot limit reached. Bot ID: a. URL: b",
                "data": { "message": "Deployed. Bot ID: abc123. URL: https://x/y" }
            }),
        ))
        .await;
        let (_dir, archive) = create_archive(b"zip");

        let result = ApiClient::new(endpoints(&base))
            .deploy(&archive, "echo", "secret-key")
            .await;

        assert!(
            matches!(result, Err(UploadError::RemoteRejected { body }) if body.contains("Bot limit reached"))
        );
    }

    #[tokio::test]
    async fn deploy_without_data() {
        let base = serve(upload_router(Arc::default(), json!({ "error": null }))).await;
        let (_dir, archive) = create_archive(b"zip");

        let result = ApiClient::new(endpoints(&base))
            .deploy(&archive, "echo", "secret-key")
            .await;

        assert!(matches!(result, Err(UploadError::RemoteRejected { .. })));
    }

    #[tokio::test]
    async fn deploy_unexpected_message() {
        let base = serve(upload_router(
            Arc::default(),
            json!({ "data": { "message": "Deployment queued" } }),
        ))
        .await;
        let (_dir, archive) = create_archive(b"zip");

        let result = ApiClient::new(endpoints(&base))
            .deploy(&archive, "echo", "secret-key")
            .await;

        assert!(
            matches!(result, Err(UploadError::UnexpectedResponseShape { message }) if message == "Deployment queued")
        );
    }

    #[tokio::test]
    async fn deploy_server_error() {
        let base = serve(Router::new().route(
            "/upload-file",
            post(|| async {
                (StatusCode::INTERNAL_SERVER_ERROR, "upstream crashed").into_response()
            }),
        ))
        .await;
        let (_dir, archive) = create_archive(b"zip");

        let result = ApiClient::new(endpoints(&base))
            .deploy(&archive, "echo", "secret-key")
            .await;

        assert!(
            matches!(result, Err(UploadError::TransportFailure { message }) if message.contains("500") && message.contains("upstream crashed"))
        );
    }

    #[tokio::test]
    async fn deploy_unreachable_host() {
        let address = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let (_dir, archive) = create_archive(b"zip");

        let result = ApiClient::new(endpoints(&format!("http://{address}")))
            .deploy(&archive, "echo", "secret-key")
            .await;

        assert!(matches!(result, Err(UploadError::TransportFailure { .. })));
    }

    #[tokio::test]
    async fn health() {
        let base = serve(Router::new().route(
            "/deploy-from-cli/bot-health",
            get(|Query(query): Query<Map<String, Value>>| async move {
                Json(json!({
                    "data": {
                        "botId": query["botId"],
                        "status": "running",
                    }
                }))
            }),
        ))
        .await;

        let data = ApiClient::new(endpoints(&base))
            .health("abc123", "secret-key")
            .await
            .expect("unable to get bot health");

        assert_json!(Value::Object(data), {
            "botId": "abc123",
            "status": "running",
        });
    }

    #[tokio::test]
    async fn health_without_data() {
        let base = serve(Router::new().route(
            "/deploy-from-cli/bot-health",
            get(|| async { Json(json!({ "message": "unknown bot" })) }),
        ))
        .await;

        let result = ApiClient::new(endpoints(&base))
            .health("abc123", "secret-key")
            .await;

        assert!(
            matches!(result, Err(RequestError::RemoteRejected { body }) if body.contains("unknown bot"))
        );
    }

    #[tokio::test]
    async fn list() {
        let base = serve(Router::new().route(
            "/deploy-from-cli/list",
            get(|headers: HeaderMap| async move {
                assert_eq!(headers["authorization"], "Bearer secret-key");

                Json(json!({
                    "data": [
                        { "name": "echo", "url": "https://bots.example/1", "id": "1" },
                        { "id": 2, "url": "https://bots.example/2", "name": "weather" },
                    ]
                }))
            }),
        ))
        .await;

        let bots = ApiClient::new(endpoints(&base))
            .list("secret-key")
            .await
            .expect("unable to list bots");

        assert_eq!(
            bots,
            vec![
                BotSummary {
                    id: json!("1"),
                    name: String::from("echo"),
                    url: String::from("https://bots.example/1"),
                },
                BotSummary {
                    id: json!(2),
                    name: String::from("weather"),
                    url: String::from("https://bots.example/2"),
                },
            ]
        );
    }

    #[tokio::test]
    async fn list_empty() {
        let base = serve(Router::new().route(
            "/deploy-from-cli/list",
            get(|| async { Json(json!({ "error": null })) }),
        ))
        .await;

        let bots = ApiClient::new(endpoints(&base))
            .list("secret-key")
            .await
            .expect("unable to list bots");

        assert!(bots.is_empty());
    }

    #[tokio::test]
    async fn delete() {
        let captured = Arc::new(Mutex::new(Value::Null));
        let request = captured.clone();

        let base = serve(Router::new().route(
            "/deploy-from-cli/delete",
            post(move |Json(body): Json<Value>| async move {
                *request.lock().unwrap() = body;
                Json(json!({ "error": null, "data": { "deleted": true } }))
            }),
        ))
        .await;

        let response = ApiClient::new(endpoints(&base))
            .delete("abc123", "secret-key")
            .await
            .expect("unable to delete bot");

        assert_json!(captured.lock().unwrap().clone(), {
            "botId": "abc123"
        });
        assert_json!(Value::Object(response), {
            "data": {
                "deleted": true
            }
        });
    }

    #[test]
    fn interpret_rejected_error_status() {
        let result = interpret::<Value>(
            StatusCode::UNAUTHORIZED,
            String::from(r#"{"error":"invalid api key"}"#),
        );

        assert!(matches!(result, Err(RequestError::RemoteRejected { .. })));
    }

    #[test]
    fn interpret_malformed_success() {
        let result = interpret::<Vec<BotSummary>>(
            StatusCode::OK,
            String::from(r#"{"data":[{"id":1}]}"#),
        );

        assert!(matches!(result, Err(RequestError::RemoteRejected { .. })));
    }
}
