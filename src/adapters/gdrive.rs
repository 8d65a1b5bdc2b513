use crate::domain::model::StoredToken;
use crate::domain::ports::Uploader;
use crate::utils::error::{BackupError, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::header::LOCATION;
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens within this window of their expiry are refreshed up front instead
/// of failing mid-upload.
const REFRESH_SKEW_SECONDS: i64 = 60;

/// `credentials.json` in Google's installed-app layout.
#[derive(Debug, Clone, Deserialize)]
struct InstalledClientSecret {
    installed: InstalledApp,
}

#[derive(Debug, Clone, Deserialize)]
struct InstalledApp {
    client_id: String,
    client_secret: String,
    #[serde(default = "default_auth_uri")]
    auth_uri: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

/// Google Drive credential lifecycle: persisted token if usable, refresh if
/// expired, one-time interactive consent flow otherwise. The resulting
/// credential is always written back to `token_path`.
pub struct GoogleAuth {
    client: Client,
    token_path: PathBuf,
    credentials_path: PathBuf,
}

impl GoogleAuth {
    pub fn new(
        client: Client,
        token_path: impl Into<PathBuf>,
        credentials_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            token_path: token_path.into(),
            credentials_path: credentials_path.into(),
        }
    }

    pub async fn authenticate(&self) -> Result<StoredToken> {
        if self.token_path.exists() {
            match self.load_persisted() {
                Ok(token)
                    if !token.is_expired(Utc::now(), Duration::seconds(REFRESH_SKEW_SECONDS)) =>
                {
                    tracing::debug!("Using persisted Google Drive credential");
                    return Ok(token);
                }
                Ok(token) => match self.refresh(&token).await {
                    Ok(refreshed) => {
                        self.persist(&refreshed)?;
                        tracing::info!("Refreshed Google Drive credential");
                        return Ok(refreshed);
                    }
                    Err(e) => tracing::warn!(
                        "Google token refresh failed, falling back to interactive authorization: {}",
                        e
                    ),
                },
                Err(e) => tracing::warn!(
                    "Ignoring unreadable credential file {}: {}",
                    self.token_path.display(),
                    e
                ),
            }
        }

        let token = self.authorize_interactively().await?;
        self.persist(&token)?;
        Ok(token)
    }

    fn load_persisted(&self) -> Result<StoredToken> {
        let raw = std::fs::read_to_string(&self.token_path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn persist(&self, token: &StoredToken) -> Result<()> {
        let json = serde_json::to_string_pretty(token)?;
        std::fs::write(&self.token_path, json)?;
        Ok(())
    }

    async fn refresh(&self, token: &StoredToken) -> Result<StoredToken> {
        let params = [
            ("client_id", token.client_id.as_str()),
            ("client_secret", token.client_secret.as_str()),
            ("refresh_token", token.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self.client.post(&token.token_uri).form(&params).send().await?;
        if !response.status().is_success() {
            return Err(BackupError::Auth {
                message: format!("Google token endpoint returned {}", response.status()),
            });
        }

        let grant: TokenGrant = response.json().await.map_err(|e| BackupError::Auth {
            message: format!("malformed Google token response: {}", e),
        })?;

        Ok(StoredToken {
            access_token: grant.access_token,
            refresh_token: grant
                .refresh_token
                .unwrap_or_else(|| token.refresh_token.clone()),
            expiry: grant.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
            ..token.clone()
        })
    }

    /// Blocks until the user completes the consent page and the loopback
    /// redirect delivers an authorization code.
    async fn authorize_interactively(&self) -> Result<StoredToken> {
        let app = self.load_client_secret()?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let redirect_uri = format!("http://127.0.0.1:{}", listener.local_addr()?.port());

        let consent_url = Url::parse_with_params(
            &app.auth_uri,
            &[
                ("client_id", app.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", DRIVE_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| BackupError::Auth {
            message: format!("invalid authorization URI {}: {}", app.auth_uri, e),
        })?;

        println!("Open this URL in your browser to authorize Google Drive access:");
        println!();
        println!("  {}", consent_url);
        println!();
        println!("Waiting for the authorization redirect...");

        let code = wait_for_authorization_code(&listener).await?;
        tracing::info!("Authorization code received");

        let params = [
            ("client_id", app.client_id.as_str()),
            ("client_secret", app.client_secret.as_str()),
            ("code", code.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];
        let response = self.client.post(&app.token_uri).form(&params).send().await?;
        if !response.status().is_success() {
            return Err(BackupError::Auth {
                message: format!(
                    "authorization code exchange returned {}",
                    response.status()
                ),
            });
        }

        let grant: TokenGrant = response.json().await.map_err(|e| BackupError::Auth {
            message: format!("malformed Google token response: {}", e),
        })?;
        let refresh_token = grant.refresh_token.ok_or_else(|| BackupError::Auth {
            message: "authorization response carried no refresh token".to_string(),
        })?;

        Ok(StoredToken {
            access_token: grant.access_token,
            refresh_token,
            client_id: app.client_id,
            client_secret: app.client_secret,
            token_uri: app.token_uri,
            scopes: vec![DRIVE_SCOPE.to_string()],
            expiry: grant.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        })
    }

    fn load_client_secret(&self) -> Result<InstalledApp> {
        let raw =
            std::fs::read_to_string(&self.credentials_path).map_err(|e| BackupError::Auth {
                message: format!(
                    "cannot read client secret file {}: {}",
                    self.credentials_path.display(),
                    e
                ),
            })?;
        let secret: InstalledClientSecret =
            serde_json::from_str(&raw).map_err(|e| BackupError::Auth {
                message: format!("malformed client secret file: {}", e),
            })?;
        Ok(secret.installed)
    }
}

async fn wait_for_authorization_code(listener: &TcpListener) -> Result<String> {
    loop {
        let (mut stream, _) = listener.accept().await?;
        let mut buf = vec![0u8; 4096];
        let n = stream.read(&mut buf).await?;
        let request = String::from_utf8_lossy(&buf[..n]).into_owned();

        let target = match request_target(&request) {
            Some(target) => target.to_string(),
            None => {
                respond(&mut stream, 400, "Bad request").await?;
                continue;
            }
        };

        if let Some(error) = query_param(&target, "error") {
            respond(
                &mut stream,
                200,
                "Authorization was denied. You can close this window.",
            )
            .await?;
            return Err(BackupError::Auth {
                message: format!("authorization was denied: {}", error),
            });
        }

        if let Some(code) = query_param(&target, "code") {
            respond(
                &mut stream,
                200,
                "Authorization received. You can close this window.",
            )
            .await?;
            return Ok(code);
        }

        // Browsers also ask for /favicon.ico; keep listening.
        respond(&mut stream, 404, "Not found").await?;
    }
}

fn request_target(request: &str) -> Option<&str> {
    let line = request.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    (method == "GET").then_some(target)
}

fn query_param(target: &str, key: &str) -> Option<String> {
    let url = Url::parse(&format!("http://localhost{}", target)).ok()?;
    url.query_pairs()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.into_owned())
}

async fn respond(stream: &mut TcpStream, status: u16, body: &str) -> Result<()> {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        _ => "Not Found",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

/// Google Drive destination: create a file record bound to a resumable
/// session, then PUT the media bytes to the session URI.
pub struct GoogleDrive {
    client: Client,
    upload_base: String,
    token: StoredToken,
}

impl GoogleDrive {
    pub fn new(client: Client, upload_base: impl Into<String>, token: StoredToken) -> Self {
        Self {
            client,
            upload_base: upload_base.into(),
            token,
        }
    }

    fn error(&self, message: String) -> BackupError {
        BackupError::Upload {
            provider: "Google Drive".to_string(),
            message,
        }
    }
}

#[async_trait]
impl Uploader for GoogleDrive {
    fn name(&self) -> &str {
        "Google Drive"
    }

    async fn upload(&self, local_path: &Path) -> Result<Option<String>> {
        let file_name = local_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| self.error(format!("invalid local path {}", local_path.display())))?;

        let response = self
            .client
            .post(&self.upload_base)
            .bearer_auth(&self.token.access_token)
            .query(&[("uploadType", "resumable")])
            .json(&serde_json::json!({ "name": file_name }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.error(format!(
                "resumable session request returned {}",
                response.status()
            )));
        }

        let session_uri = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                self.error("resumable session response had no Location header".to_string())
            })?;

        let bytes = tokio::fs::read(local_path).await?;
        let put = self.client.put(&session_uri).body(bytes).send().await?;
        if !put.status().is_success() {
            return Err(self.error(format!("media upload returned {}", put.status())));
        }

        let file: DriveFile = put
            .json()
            .await
            .map_err(|e| self.error(format!("malformed media upload response: {}", e)))?;

        Ok(Some(file.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use tempfile::TempDir;

    fn stored_token(token_uri: String, expiry: Option<chrono::DateTime<Utc>>) -> StoredToken {
        StoredToken {
            access_token: "stale-access".to_string(),
            refresh_token: "stored-refresh".to_string(),
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            token_uri,
            scopes: vec![DRIVE_SCOPE.to_string()],
            expiry,
        }
    }

    #[tokio::test]
    async fn test_authenticate_uses_valid_persisted_token() {
        let dir = TempDir::new().unwrap();
        let token_path = dir.path().join("token.json");
        let token = stored_token(
            "https://oauth2.googleapis.com/token".to_string(),
            Some(Utc::now() + Duration::hours(1)),
        );
        std::fs::write(&token_path, serde_json::to_string(&token).unwrap()).unwrap();

        let auth = GoogleAuth::new(
            Client::new(),
            &token_path,
            dir.path().join("credentials.json"),
        );
        let loaded = auth.authenticate().await.unwrap();

        assert_eq!(loaded.access_token, "stale-access");
    }

    #[tokio::test]
    async fn test_authenticate_refreshes_expired_token_and_persists() {
        let server = MockServer::start();
        let refresh_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/token")
                .body_contains("grant_type=refresh_token")
                .body_contains("refresh_token=stored-refresh");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "access_token": "fresh-access",
                    "expires_in": 3599,
                    "token_type": "Bearer"
                }));
        });

        let dir = TempDir::new().unwrap();
        let token_path = dir.path().join("token.json");
        let expired = stored_token(
            server.url("/token"),
            Some(Utc::now() - Duration::minutes(5)),
        );
        std::fs::write(&token_path, serde_json::to_string(&expired).unwrap()).unwrap();

        let auth = GoogleAuth::new(
            Client::new(),
            &token_path,
            dir.path().join("credentials.json"),
        );
        let refreshed = auth.authenticate().await.unwrap();

        refresh_mock.assert();
        assert_eq!(refreshed.access_token, "fresh-access");
        // rotation absent, the stored refresh token is kept
        assert_eq!(refreshed.refresh_token, "stored-refresh");
        assert!(refreshed.expiry.unwrap() > Utc::now());

        let rewritten: StoredToken =
            serde_json::from_str(&std::fs::read_to_string(&token_path).unwrap()).unwrap();
        assert_eq!(rewritten.access_token, "fresh-access");
    }

    #[tokio::test]
    async fn test_authenticate_without_any_credentials_fails() {
        let dir = TempDir::new().unwrap();
        let auth = GoogleAuth::new(
            Client::new(),
            dir.path().join("token.json"),
            dir.path().join("credentials.json"),
        );

        let err = auth.authenticate().await.unwrap_err();
        assert!(matches!(err, BackupError::Auth { .. }));
    }

    #[tokio::test]
    async fn test_wait_for_authorization_code_extracts_code() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(b"GET /?code=auth-code-42&scope=drive HTTP/1.1\r\nHost: localhost\r\n\r\n")
                .await
                .unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();
            response
        });

        let code = wait_for_authorization_code(&listener).await.unwrap();
        assert_eq!(code, "auth-code-42");

        let response = client.await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
    }

    #[tokio::test]
    async fn test_wait_for_authorization_code_denied() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(b"GET /?error=access_denied HTTP/1.1\r\n\r\n")
                .await
                .unwrap();
            let mut response = String::new();
            let _ = stream.read_to_string(&mut response).await;
        });

        let err = wait_for_authorization_code(&listener).await.unwrap_err();
        match err {
            BackupError::Auth { message } => assert!(message.contains("access_denied")),
            other => panic!("expected Auth error, got {}", other),
        }
    }

    #[test]
    fn test_request_target_parsing() {
        assert_eq!(
            request_target("GET /?code=x HTTP/1.1\r\nHost: h\r\n"),
            Some("/?code=x")
        );
        assert_eq!(request_target("POST / HTTP/1.1"), None);
        assert_eq!(request_target(""), None);
    }

    #[test]
    fn test_query_param_extraction() {
        assert_eq!(
            query_param("/?code=abc&scope=drive", "code"),
            Some("abc".to_string())
        );
        assert_eq!(
            query_param("/?error=access_denied", "error"),
            Some("access_denied".to_string())
        );
        assert_eq!(query_param("/favicon.ico", "code"), None);
    }

    #[tokio::test]
    async fn test_upload_creates_session_then_puts_media() {
        let server = MockServer::start();
        let session_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/upload/drive/v3/files")
                .query_param("uploadType", "resumable")
                .header("Authorization", "Bearer access-token")
                .json_body(serde_json::json!({"name": "3_20240101_120000.jpg"}));
            then.status(200)
                .header("Location", server.url("/upload-session"));
        });
        let media_mock = server.mock(|when, then| {
            when.method(PUT).path("/upload-session").body("jpeg-bytes");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"id": "drive-file-id", "name": "3_20240101_120000.jpg"}));
        });

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("3_20240101_120000.jpg");
        std::fs::write(&path, b"jpeg-bytes").unwrap();

        let mut token = stored_token(server.url("/token"), None);
        token.access_token = "access-token".to_string();
        let drive = GoogleDrive::new(
            Client::new(),
            server.url("/upload/drive/v3/files"),
            token,
        );

        let id = drive.upload(&path).await.unwrap();

        session_mock.assert();
        media_mock.assert();
        assert_eq!(id.as_deref(), Some("drive-file-id"));
    }

    #[tokio::test]
    async fn test_upload_without_session_uri_fails() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/upload/drive/v3/files");
            then.status(200);
        });

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, b"x").unwrap();

        let token = stored_token(server.url("/token"), None);
        let drive = GoogleDrive::new(
            Client::new(),
            server.url("/upload/drive/v3/files"),
            token,
        );

        let err = drive.upload(&path).await.unwrap_err();
        match err {
            BackupError::Upload { provider, message } => {
                assert_eq!(provider, "Google Drive");
                assert!(message.contains("Location"));
            }
            other => panic!("expected Upload error, got {}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_failed_media_put() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/upload/drive/v3/files");
            then.status(200)
                .header("Location", server.url("/upload-session"));
        });
        server.mock(|when, then| {
            when.method(PUT).path("/upload-session");
            then.status(500);
        });

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, b"x").unwrap();

        let token = stored_token(server.url("/token"), None);
        let drive = GoogleDrive::new(
            Client::new(),
            server.url("/upload/drive/v3/files"),
            token,
        );

        let err = drive.upload(&path).await.unwrap_err();
        assert!(matches!(err, BackupError::Upload { .. }));
    }
}
