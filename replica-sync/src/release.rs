//! Release resolver and asset transport.
//!
//! One blocking HTTP agent per run. The bearer credential, when configured,
//! is attached to every request. ureq does not forward it across redirects,
//! so asset downloads that bounce to a CDN never leak it.

use std::fs::File;
use std::io;
use std::path::Path;
use std::time::Duration;

use replica_core::{Credential, ReleaseDescriptor, RemoteCoordinates, SyncSettings};

use crate::error::{io_err, SyncError};

pub const ACCEPT_RELEASE_JSON: &str = "application/vnd.github+json";
pub const ACCEPT_OCTET_STREAM: &str = "application/octet-stream";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(300);

/// Client for the remote release store.
#[derive(Clone)]
pub struct ReleaseClient {
    agent: ureq::Agent,
    api_base: String,
    credential: Option<Credential>,
}

impl std::fmt::Debug for ReleaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseClient")
            .field("api_base", &self.api_base)
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl ReleaseClient {
    pub fn new(api_base: impl Into<String>, credential: Option<Credential>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .user_agent(&format!("replica/{}", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            credential,
        }
    }

    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self::new(settings.api_base.clone(), settings.credential.clone())
    }

    /// `<api_base>/repos/{owner}/{repo}/releases/latest`
    pub fn latest_url(&self, coords: &RemoteCoordinates) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base, coords.owner, coords.repo
        )
    }

    /// Fetch the latest release descriptor. Never cached.
    pub fn latest(&self, coords: &RemoteCoordinates) -> Result<ReleaseDescriptor, SyncError> {
        let url = self.latest_url(coords);
        let unavailable = |reason: String| SyncError::RemoteUnavailable {
            target: coords.to_string(),
            reason,
        };

        tracing::debug!(url = %url, "querying latest release");
        let response = self
            .request(&url, ACCEPT_RELEASE_JSON)
            .call()
            .map_err(|err| unavailable(describe_ureq_error(err)))?;

        let descriptor: ReleaseDescriptor = response
            .into_json()
            .map_err(|err| unavailable(format!("malformed release payload: {err}")))?;
        if descriptor.tag.as_str().trim().is_empty() {
            return Err(unavailable("release payload has an empty tag_name".to_string()));
        }

        tracing::debug!(
            tag = %descriptor.tag,
            assets = descriptor.assets.len(),
            "resolved latest release"
        );
        Ok(descriptor)
    }

    /// Stream `url` into `dest`, returning the number of bytes written.
    ///
    /// A body shorter than its declared `Content-Length` is a
    /// [`SyncError::Download`]; the partial file is removed.
    pub fn download(&self, url: &str, dest: &Path) -> Result<u64, SyncError> {
        let failed = |reason: String| SyncError::Download {
            url: url.to_string(),
            reason,
        };

        tracing::debug!(url = %url, dest = %dest.display(), "downloading asset");
        // Non-2xx responses arrive as `ureq::Error::Status`.
        let response = self
            .request(url, ACCEPT_OCTET_STREAM)
            .call()
            .map_err(|err| failed(describe_ureq_error(err)))?;

        let mut file = File::create(dest).map_err(|e| io_err(dest, e))?;
        // ureq's body reader fails when the connection closes before
        // `Content-Length` bytes arrive, so truncation surfaces here.
        let mut reader = response.into_reader();
        let copied = io::copy(&mut reader, &mut file).and_then(|n| file.sync_all().map(|()| n));
        match copied {
            Ok(written) => Ok(written),
            Err(err) => {
                drop(file);
                let _ = std::fs::remove_file(dest);
                Err(failed(format!("transfer interrupted: {err}")))
            }
        }
    }

    fn request(&self, url: &str, accept: &str) -> ureq::Request {
        let request = self.agent.get(url).set("Accept", accept);
        match &self.credential {
            Some(credential) => request.set("Authorization", &credential.bearer()),
            None => request,
        }
    }
}

fn describe_ureq_error(err: ureq::Error) -> String {
    match err {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            let body = body.trim();
            if body.is_empty() {
                format!("HTTP {code}")
            } else {
                let snippet: String = body.chars().take(200).collect();
                format!("HTTP {code}: {snippet}")
            }
        }
        ureq::Error::Transport(transport) => transport.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use tempfile::TempDir;

    fn coords() -> RemoteCoordinates {
        RemoteCoordinates::new("acme", "city")
    }

    #[test]
    fn latest_sends_store_accept_header_and_parses_descriptor() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/repos/acme/city/releases/latest")
            .match_header("accept", ACCEPT_RELEASE_JSON)
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"tag_name":"v7","assets":[{"name":"a","browser_download_url":"http://x/a"}]}"#)
            .create();

        let client = ReleaseClient::new(server.url(), None);
        let descriptor = client.latest(&coords()).unwrap();

        mock.assert();
        assert_eq!(descriptor.tag.as_str(), "v7");
        assert_eq!(descriptor.assets[0].name, "a");
    }

    #[test]
    fn latest_attaches_bearer_credential() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/repos/acme/city/releases/latest")
            .match_header("authorization", "Bearer t0k")
            .with_status(200)
            .with_body(r#"{"tag_name":"v1","assets":[]}"#)
            .create();

        let client = ReleaseClient::new(server.url(), Credential::new("t0k"));
        client.latest(&coords()).unwrap();
        mock.assert();
    }

    #[test]
    fn latest_non_2xx_is_remote_unavailable() {
        let mut server = Server::new();
        server
            .mock("GET", "/repos/acme/city/releases/latest")
            .with_status(404)
            .with_body(r#"{"message":"Not Found"}"#)
            .create();

        let err = ReleaseClient::new(server.url(), None)
            .latest(&coords())
            .unwrap_err();
        match err {
            SyncError::RemoteUnavailable { target, reason } => {
                assert_eq!(target, "acme/city");
                assert!(reason.contains("404"), "reason: {reason}");
            }
            other => panic!("expected RemoteUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn latest_malformed_body_is_remote_unavailable() {
        let mut server = Server::new();
        server
            .mock("GET", "/repos/acme/city/releases/latest")
            .with_status(200)
            .with_body("<html>rate limited</html>")
            .create();

        let err = ReleaseClient::new(server.url(), None)
            .latest(&coords())
            .unwrap_err();
        assert!(matches!(err, SyncError::RemoteUnavailable { .. }));
    }

    #[test]
    fn latest_unreachable_store_is_remote_unavailable() {
        // Port 9 on loopback: nothing listens there in test environments.
        let err = ReleaseClient::new("http://127.0.0.1:9", None)
            .latest(&coords())
            .unwrap_err();
        assert!(matches!(err, SyncError::RemoteUnavailable { .. }));
    }

    #[test]
    fn download_requests_octet_stream_and_writes_body() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/dl/db")
            .match_header("accept", ACCEPT_OCTET_STREAM)
            .with_status(200)
            .with_body(b"payload-bytes")
            .create();

        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("db");
        let n = ReleaseClient::new(server.url(), None)
            .download(&format!("{}/dl/db", server.url()), &dest)
            .unwrap();

        mock.assert();
        assert_eq!(n, 13);
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload-bytes");
    }

    #[test]
    fn download_failure_leaves_no_partial_file() {
        let mut server = Server::new();
        server.mock("GET", "/dl/db").with_status(500).create();

        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("db");
        let err = ReleaseClient::new(server.url(), None)
            .download(&format!("{}/dl/db", server.url()), &dest)
            .unwrap_err();

        assert!(matches!(err, SyncError::Download { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn body_shorter_than_content_length_fails_and_removes_partial_file() {
        use std::io::{BufRead, BufReader, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                line.clear();
            }
            let mut stream = stream;
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nhello")
                .unwrap();
        });

        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("db");
        let err = ReleaseClient::new(format!("http://{addr}"), None)
            .download(&format!("http://{addr}/dl/db"), &dest)
            .unwrap_err();
        server.join().unwrap();

        match err {
            SyncError::Download { reason, .. } => {
                assert!(reason.contains("transfer interrupted"), "reason: {reason}")
            }
            other => panic!("expected Download, got {other:?}"),
        }
        assert!(!dest.exists(), "partial download must be removed");
    }
}
