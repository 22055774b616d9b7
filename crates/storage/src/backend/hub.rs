//! Hugging Face Hub storage backend.
//!
//! This module provides a [`RemoteStore`] implementation backed by the Hub's
//! HTTP API: the recursive `tree` endpoint for listings, `raw`/`resolve` URLs
//! for content, and the NDJSON `commit` endpoint for atomic multi-file
//! writes.
//!
//! # Credentials
//!
//! Reads of public repositories need no token. Commits require a write token,
//! sent as a bearer token on every request once configured.

use crate::{
    RemoteStore,
    backend::ListEntryStream,
    error::{ErrorKind, Result},
    models::{Commit, CommitInfo, Encoding, ListEntry, RepoId},
    validate_path,
};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::{
    Client, RequestBuilder, Response,
    header::{CONTENT_TYPE, LINK},
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::Duration;

/// Public Hub endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";
/// Branch read from and committed to unless configured otherwise.
pub const DEFAULT_REVISION: &str = "main";

/// Hugging Face Hub backend.
///
/// Bound to one repository and revision; an optional write token enables
/// [`commit()`](RemoteStore::commit).
///
/// # Examples
///
/// ```no_run
/// use bookshelf_storage::backend::HubBackend;
/// use std::time::Duration;
///
/// # fn example() -> bookshelf_storage::error::Result<()> {
/// let backend = HubBackend::new(
///     "hub",
///     "datasets/MakiAi/bookshelf-db".parse()?,
///     None,
///     None,
///     Some("hf_xxx".to_string()),
///     Duration::from_secs(30),
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HubBackend {
    name: String,
    client: Client,
    endpoint: String,
    repository: RepoId,
    revision: String,
    token: Option<String>,
}

impl HubBackend {
    /// Create a new Hub backend.
    ///
    /// # Arguments
    /// * `name` - A name for this backend (used in logging)
    /// * `repository` - Repository to list and commit to
    /// * `endpoint` - Hub base URL, defaults to [`DEFAULT_ENDPOINT`]
    /// * `revision` - Branch or revision, defaults to [`DEFAULT_REVISION`]
    /// * `token` - Access token; blank tokens are treated as absent
    /// * `timeout` - Per-request timeout applied by the HTTP client
    pub fn new(
        name: impl Into<String>,
        repository: RepoId,
        endpoint: Option<String>,
        revision: Option<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let endpoint = endpoint
            .map(|e| e.trim().trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let revision = revision
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REVISION.to_string());
        let token = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bookshelf/", env!("CARGO_PKG_VERSION")))
            .build()
            .or_raise(|| ErrorKind::BackendError("could not construct HTTP client".to_string()))?;
        Ok(Self {
            name: name.into(),
            client,
            endpoint,
            repository,
            revision,
            token,
        })
    }

    /// Browser-style URL of a file: `<endpoint>/<prefix><repo>/<action>/<revision>/<path>`.
    fn file_url(&self, action: &str, path: &str) -> Result<String> {
        let validated = validate_path(path)?;
        let encoded = validated.split('/').map(urlencoding::encode).collect::<Vec<_>>().join("/");
        Ok(format!(
            "{}/{}/{}/{}/{}",
            self.endpoint,
            self.repository,
            action,
            urlencoding::encode(&self.revision),
            encoded
        ))
    }

    /// API URL: `<endpoint>/api/<collection>/<repo>/<action>/<revision>`.
    fn api_url(&self, action: &str) -> String {
        format!(
            "{}/api/{}/{}/{}/{}",
            self.endpoint,
            self.repository.kind.api_collection(),
            self.repository.name,
            action,
            urlencoding::encode(&self.revision)
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Pull the most useful message out of a failed response.
    ///
    /// The Hub usually answers with `{"error": "..."}`; anything else is
    /// passed through as text, falling back to the status reason.
    async fn error_message(response: Response) -> String {
        #[derive(Deserialize)]
        struct HubError {
            error: String,
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<HubError>(&body) {
            Ok(HubError { error }) => error,
            Err(_) if !body.trim().is_empty() => body.trim().to_string(),
            Err(_) => status.canonical_reason().unwrap_or("request failed").to_string(),
        }
    }

    /// Fetch one page of the recursive tree listing, returning its entries
    /// and the address of the next page, if any.
    async fn fetch_tree_page(&self, url: &str) -> Result<(Vec<ListEntry>, Option<String>)> {
        tracing::debug!(backend = %self.name, %url, "Listing repository");
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .or_raise(|| ErrorKind::Network(url.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = Self::error_message(response).await;
            exn::bail!(ErrorKind::from_status(status.as_u16(), self.repository.to_string(), message));
        }
        let next = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .and_then(next_page)
            .map(|target| {
                if target.starts_with('/') { format!("{}{target}", self.endpoint) } else { target.to_string() }
            });
        let entries = response.json::<Vec<ListEntry>>().await.or_raise(|| ErrorKind::Decode(url.to_string()))?;
        Ok((entries, next))
    }

    /// Serialize a commit as the Hub's NDJSON commit payload: one header
    /// line followed by one line per file.
    fn commit_payload(commit: &Commit) -> Result<String> {
        #[derive(Serialize)]
        #[serde(tag = "key", content = "value", rename_all = "camelCase")]
        enum Line<'a> {
            Header { summary: &'a str, description: &'a str },
            File { path: &'a str, content: Cow<'a, str>, encoding: Encoding },
        }
        let header = Line::Header {
            summary: &commit.summary,
            description: commit.description.as_deref().unwrap_or_default(),
        };
        let files = commit.operations.iter().map(|op| Line::File {
            path: &op.path,
            content: op.encoded_content(),
            encoding: op.encoding(),
        });
        let mut payload = String::new();
        for line in std::iter::once(header).chain(files) {
            let json = serde_json::to_string(&line)
                .or_raise(|| ErrorKind::BackendError("could not encode commit payload".to_string()))?;
            payload.push_str(&json);
            payload.push('\n');
        }
        Ok(payload)
    }
}

#[async_trait]
impl RemoteStore for HubBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn repository(&self) -> &RepoId {
        &self.repository
    }

    fn list_stream(&self) -> ListEntryStream<'_> {
        // The tree endpoint pages its results through `Link: <...>; rel="next"`.
        // Every page is followed so the listing is always complete.
        Box::pin(stream! {
            let mut url = format!("{}?recursive=true", self.api_url("tree"));
            loop {
                let (entries, next) = match self.fetch_tree_page(&url).await {
                    Ok(page) => page,
                    Err(e) => {
                        yield Err(e);
                        return;
                    },
                };
                for entry in entries {
                    yield Ok(entry);
                }
                match next {
                    Some(next) if next == url => {
                        yield Err(exn::Exn::from(ErrorKind::Decode(format!("listing page links to itself: {url}"))));
                        return;
                    },
                    Some(next) => url = next,
                    None => return,
                }
            }
        })
    }

    fn resolve_url(&self, path: &str) -> Result<String> {
        self.file_url("resolve", path)
    }

    fn raw_url(&self, path: &str) -> Result<String> {
        self.file_url("raw", path)
    }

    async fn fetch_raw(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .or_raise(|| ErrorKind::Network(url.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let message = Self::error_message(response).await;
            exn::bail!(ErrorKind::from_status(status.as_u16(), url, message));
        }
        let bytes = response.bytes().await.or_raise(|| ErrorKind::Network(url.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn can_commit(&self) -> bool {
        self.token.is_some()
    }

    async fn commit(&self, commit: Commit) -> Result<CommitInfo> {
        if !self.can_commit() {
            exn::bail!(ErrorKind::PermissionDenied(self.repository.to_string()));
        }
        let url = self.api_url("commit");
        let payload = Self::commit_payload(&commit)?;
        tracing::info!(
            backend = %self.name,
            repository = %self.repository,
            operations = commit.operations.len(),
            payload_bytes = payload.len(),
            "Submitting commit"
        );
        let response = self
            .authorize(self.client.post(&url))
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(payload)
            .send()
            .await
            .or_raise(|| ErrorKind::Network(url.clone()))?;
        let status = response.status();
        if !status.is_success() {
            // Always keep status and message together for commits; the
            // caller decides between retrying under a new name and giving up.
            let message = Self::error_message(response).await;
            exn::bail!(ErrorKind::Http { status: status.as_u16(), message });
        }
        response.json::<CommitInfo>().await.or_raise(|| ErrorKind::Decode(url))
    }
}

/// Target of the `rel="next"` entry of a `Link` header.
fn next_page(link: &str) -> Option<&str> {
    link.split(',').find_map(|part| {
        let (target, params) = part.trim().split_once(';')?;
        let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        let is_next = params.split(';').filter_map(|param| param.split_once('=')).any(|(key, value)| {
            key.trim().eq_ignore_ascii_case("rel")
                && value.trim().trim_matches('"').split_whitespace().any(|rel| rel.eq_ignore_ascii_case("next"))
        });
        is_next.then_some(target)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommitOperation;
    use rstest::rstest;

    #[rstest]
    #[case(
        r#"<https://huggingface.co/api/datasets/a/b/tree/main?recursive=true&cursor=abc>; rel="next""#,
        Some("https://huggingface.co/api/datasets/a/b/tree/main?recursive=true&cursor=abc")
    )]
    #[case(r#"<https://h.co/prev>; rel="prev", <https://h.co/next>; rel="next""#, Some("https://h.co/next"))]
    #[case("<https://h.co/next>; rel=next", Some("https://h.co/next"))]
    #[case(r#"</api/x?cursor=1>; title="page 2"; rel="last next""#, Some("/api/x?cursor=1"))]
    #[case(r#"<https://h.co/prev>; rel="prev""#, None)]
    #[case("https://h.co/next; rel=next", None)]
    #[case("", None)]
    fn test_next_page(#[case] link: &str, #[case] expected: Option<&str>) {
        assert_eq!(next_page(link), expected);
    }

    fn backend(repository: &str, revision: Option<&str>) -> HubBackend {
        HubBackend::new(
            "test",
            repository.parse().unwrap(),
            None,
            revision.map(str::to_string),
            None,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_raw_url_for_dataset() {
        let hub = backend("datasets/MakiAi/bookshelf-db", None);
        assert_eq!(
            hub.raw_url("Alpha/metadata.json").unwrap(),
            "https://huggingface.co/datasets/MakiAi/bookshelf-db/raw/main/Alpha/metadata.json"
        );
    }

    #[test]
    fn test_resolve_url_for_model() {
        let hub = backend("owner/model", None);
        assert_eq!(
            hub.resolve_url("loose.png").unwrap(),
            "https://huggingface.co/owner/model/resolve/main/loose.png"
        );
    }

    #[test]
    fn test_url_segments_are_encoded() {
        let hub = backend("datasets/a/b", Some("refs/pr/1"));
        assert_eq!(
            hub.resolve_url("My Book/01#1.png").unwrap(),
            "https://huggingface.co/datasets/a/b/resolve/refs%2Fpr%2F1/My%20Book/01%231.png"
        );
    }

    #[test]
    fn test_url_rejects_traversal() {
        let hub = backend("datasets/a/b", None);
        assert!(hub.raw_url("../other/secret").is_err());
    }

    #[test]
    fn test_api_urls() {
        let hub = backend("datasets/MakiAi/bookshelf-db", None);
        assert_eq!(hub.api_url("tree"), "https://huggingface.co/api/datasets/MakiAi/bookshelf-db/tree/main");
        assert_eq!(hub.api_url("commit"), "https://huggingface.co/api/datasets/MakiAi/bookshelf-db/commit/main");
    }

    #[test]
    fn test_endpoint_and_token_normalization() {
        let hub = HubBackend::new(
            "test",
            "a/b".parse().unwrap(),
            Some("http://localhost:8080/".to_string()),
            Some("  ".to_string()),
            Some("   ".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(hub.endpoint, "http://localhost:8080");
        assert_eq!(hub.revision, DEFAULT_REVISION);
        assert!(!hub.can_commit());
    }

    #[test]
    fn test_commit_payload_is_ndjson() {
        let mut commit = Commit::new("Add book \"Test\" (1 pages)");
        commit.push(CommitOperation::text("Alpha/metadata.json", "{\"title\":\"テスト\"}").unwrap());
        commit.push(CommitOperation::binary("Alpha/01.png", vec![1, 2, 3]).unwrap());
        let payload = HubBackend::commit_payload(&commit).unwrap();
        let lines: Vec<serde_json::Value> =
            payload.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["key"], "header");
        assert_eq!(lines[0]["value"]["summary"], "Add book \"Test\" (1 pages)");
        assert_eq!(lines[0]["value"]["description"], "");
        assert_eq!(lines[1]["key"], "file");
        assert_eq!(lines[1]["value"]["encoding"], "utf-8");
        assert_eq!(lines[1]["value"]["content"], "{\"title\":\"テスト\"}");
        assert_eq!(lines[2]["value"]["path"], "Alpha/01.png");
        assert_eq!(lines[2]["value"]["encoding"], "base64");
        assert_eq!(lines[2]["value"]["content"], "AQID");
        assert!(payload.ends_with('\n'));
    }
}
