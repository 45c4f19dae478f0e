use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use url::Url;

use super::{ContentStore, StoreEntry};
use crate::config::{GithubConfig, GithubTarget};
use crate::error::VerseError;

const GITHUB_API_VERSION: &str = "2022-11-28";

/// [`ContentStore`] backed by the GitHub REST API: "contents" for single
/// files, "git trees" for directory listings.
#[derive(Clone)]
pub struct GithubStore {
    client: reqwest::Client,
    api_base: Url,
    token: String,
    owner: String,
    repo: String,
    branch: String,
}

impl GithubStore {
    /// Build the client once at start-up; it is shared by every request.
    pub fn new(target: GithubTarget, cfg: &GithubConfig) -> Result<Self, VerseError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("verse-nexus/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .default_headers(headers);
        builder = match cfg.proxy.as_ref() {
            Some(proxy_url) => builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?),
            None => builder.no_proxy(),
        };
        let client = builder.build()?;

        if cfg.api_base.cannot_be_a_base() {
            return Err(VerseError::InvalidApiBase(cfg.api_base.to_string()));
        }

        Ok(Self {
            client,
            api_base: cfg.api_base.clone(),
            token: target.token,
            owner: target.owner,
            repo: target.repo,
            branch: cfg.branch.clone(),
        })
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// `{api_base}/repos/{owner}/{repo}/contents/{path...}`
    fn contents_url(&self, path: &str) -> Result<Url, VerseError> {
        let segments = path.split('/').filter(|s| !s.is_empty());
        let base = ["repos", self.owner.as_str(), self.repo.as_str(), "contents"];
        self.endpoint(base.into_iter().chain(segments))
    }

    /// `{api_base}/repos/{owner}/{repo}/git/trees/{branch}:{dir}`
    ///
    /// The contents API caps directory listings at 1,000 entries; the trees
    /// API allows far more and reports when it had to cut the result.
    fn tree_url(&self, dir: &str) -> Result<Url, VerseError> {
        let tree_ish = format!("{}:{}", self.branch, dir.trim_matches('/'));
        self.endpoint([
            "repos",
            self.owner.as_str(),
            self.repo.as_str(),
            "git",
            "trees",
            tree_ish.as_str(),
        ])
    }

    fn branch_url(&self) -> Result<Url, VerseError> {
        self.endpoint([
            "repos",
            self.owner.as_str(),
            self.repo.as_str(),
            "branches",
            self.branch.as_str(),
        ])
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, VerseError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| VerseError::InvalidApiBase(self.api_base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET a contents URL on the configured branch; 404 becomes `None`.
    async fn get_contents(&self, path: &str) -> Result<Option<ContentsResponse>, VerseError> {
        let url = self.contents_url(path)?;
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(&[("ref", self.branch.as_str())])
            .send()
            .await?;

        let status = resp.status();
        debug!(path, status = %status, "GitHub contents lookup");
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check_status(resp).await?;
        Ok(Some(resp.json::<ContentsResponse>().await?))
    }
}

#[async_trait]
impl ContentStore for GithubStore {
    async fn read(&self, path: &str) -> Result<Option<String>, VerseError> {
        match self.get_contents(path).await? {
            None => Ok(None),
            Some(ContentsResponse::File(file)) => decode_file(file).map(Some),
            Some(ContentsResponse::Directory(_)) => Err(VerseError::UnexpectedResponse(format!(
                "{path} is a directory, expected a file"
            ))),
        }
    }

    async fn write(&self, path: &str, content: &str, message: &str) -> Result<(), VerseError> {
        let url = self.contents_url(path)?;
        let body = CreateFileRequest {
            message,
            content: STANDARD.encode(content),
            branch: &self.branch,
        };
        let resp = self
            .client
            .put(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        check_status(resp).await?;
        info!(path, repo = %self.full_name(), branch = %self.branch, "created file on GitHub");
        Ok(())
    }

    async fn list(&self, dir: &str) -> Result<Option<Vec<StoreEntry>>, VerseError> {
        let resp = self
            .client
            .get(self.tree_url(dir)?)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        debug!(dir, status = %status, "GitHub tree lookup");
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let tree: TreeResponse = check_status(resp).await?.json().await?;
        if tree.truncated {
            return Err(VerseError::UnexpectedResponse(format!(
                "GitHub truncated the listing of {dir}"
            )));
        }

        let dir = dir.trim_matches('/');
        Ok(Some(
            tree.tree
                .into_iter()
                .map(|item| StoreEntry {
                    is_file: item.kind == "blob",
                    path: format!("{dir}/{}", item.path),
                    name: item.path,
                })
                .collect(),
        ))
    }

    async fn ping(&self) -> Result<(), VerseError> {
        let resp = self
            .client
            .get(self.branch_url()?)
            .bearer_auth(&self.token)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{}@{}", self.full_name(), self.branch)
    }
}

/// Turn a non-success response into [`VerseError::Upstream`], keeping GitHub's message.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, VerseError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GithubErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or(body);
    error!(status = %status, message = %message, "GitHub API request failed");
    Err(VerseError::Upstream { status, message })
}

/// GitHub wraps base64 payloads at 60 columns; whitespace must be dropped first.
fn decode_file(file: ContentFile) -> Result<String, VerseError> {
    match file.encoding.as_deref() {
        Some("base64") | None => {}
        Some(other) => {
            return Err(VerseError::UnexpectedResponse(format!(
                "{} has unsupported encoding `{other}`",
                file.path
            )));
        }
    }
    let packed: String = file
        .content
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD.decode(packed)?;
    Ok(String::from_utf8(bytes)?)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Directory(Vec<IgnoredAny>),
    File(ContentFile),
}

#[derive(Debug, Deserialize)]
struct ContentFile {
    path: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Serialize)]
struct CreateFileRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
}

#[derive(Debug, Deserialize)]
struct GithubErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(api_base: &str) -> GithubStore {
        let cfg = GithubConfig {
            api_base: Url::parse(api_base).unwrap(),
            ..GithubConfig::default()
        };
        let target = GithubTarget {
            token: "t".into(),
            owner: "mace-eu".into(),
            repo: "MACE-EU".into(),
        };
        GithubStore::new(target, &cfg).unwrap()
    }

    #[test]
    fn contents_url_is_built_from_segments() {
        let s = store("https://api.github.com/");
        assert_eq!(
            s.contents_url("daily-verses/bible_verse_2025-08-05.html")
                .unwrap()
                .as_str(),
            "https://api.github.com/repos/mace-eu/MACE-EU/contents/daily-verses/bible_verse_2025-08-05.html"
        );
        assert_eq!(
            s.branch_url().unwrap().as_str(),
            "https://api.github.com/repos/mace-eu/MACE-EU/branches/main"
        );
        assert_eq!(
            s.tree_url("/daily-verses/").unwrap().as_str(),
            "https://api.github.com/repos/mace-eu/MACE-EU/git/trees/main:daily-verses"
        );
    }

    #[test]
    fn enterprise_base_path_is_preserved() {
        let s = store("https://git.example.org/api/v3");
        assert_eq!(
            s.contents_url("daily-verses").unwrap().as_str(),
            "https://git.example.org/api/v3/repos/mace-eu/MACE-EU/contents/daily-verses"
        );
    }

    #[test]
    fn wrapped_base64_content_is_decoded() {
        let encoded = STANDARD.encode("<p>Psalm 23 — യഹോവ</p>");
        let (head, tail) = encoded.split_at(10);
        let file = ContentFile {
            path: "daily-verses/a.html".into(),
            content: Some(format!("{head}\n{tail}\n")),
            encoding: Some("base64".into()),
        };
        assert_eq!(decode_file(file).unwrap(), "<p>Psalm 23 — യഹോവ</p>");
    }

    #[test]
    fn contents_response_distinguishes_files_and_directories() {
        let dir: ContentsResponse = serde_json::from_str(
            r#"[{"name":"bible_verse_2025-08-05.html","path":"daily-verses/bible_verse_2025-08-05.html","type":"file","sha":"abc"}]"#,
        )
        .unwrap();
        assert!(matches!(dir, ContentsResponse::Directory(ref items) if items.len() == 1));

        let file: ContentsResponse = serde_json::from_str(
            r#"{"type":"file","name":"a.html","path":"daily-verses/a.html","content":"aGk=\n","encoding":"base64"}"#,
        )
        .unwrap();
        assert!(matches!(file, ContentsResponse::File(_)));
    }

    #[test]
    fn unsupported_encoding_is_an_error() {
        let file = ContentFile {
            path: "big.html".into(),
            content: Some(String::new()),
            encoding: Some("none".into()),
        };
        assert!(matches!(
            decode_file(file),
            Err(VerseError::UnexpectedResponse(_))
        ));
    }

    mod over_http {
        use super::*;
        use axum::{
            Json, Router,
            extract::{Path, Query, Request, State},
            http::header::AUTHORIZATION,
            middleware::{self, Next},
            response::{IntoResponse, Response},
            routing::get,
        };
        use serde_json::{Value, json};
        use std::collections::{BTreeMap, BTreeSet, HashMap};
        use std::sync::{Arc, Mutex};
        use tokio::net::TcpListener;

        const TOKEN: &str = "ghp_fake";

        /// Minimal stand-in for the GitHub endpoints the store talks to.
        #[derive(Clone, Default)]
        struct FakeGithub {
            files: Arc<Mutex<BTreeMap<String, String>>>,
            puts: Arc<Mutex<Vec<Value>>>,
            truncate_trees: bool,
        }

        impl FakeGithub {
            fn with_file(self, path: &str, content: &str) -> Self {
                self.files
                    .lock()
                    .unwrap()
                    .insert(path.to_string(), content.to_string());
                self
            }
        }

        fn not_found(message: &str) -> Response {
            (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
        }

        async fn require_token(req: Request, next: Next) -> Response {
            let expected = format!("Bearer {TOKEN}");
            let auth = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());
            if auth != Some(expected.as_str()) {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "message": "Bad credentials" })),
                )
                    .into_response();
            }
            next.run(req).await
        }

        async fn get_contents(
            State(fake): State<FakeGithub>,
            Path((_owner, _repo, path)): Path<(String, String, String)>,
            Query(query): Query<HashMap<String, String>>,
        ) -> Response {
            if query.get("ref").map(String::as_str) != Some("main") {
                return not_found("No commit found for the ref");
            }
            let files = fake.files.lock().unwrap();
            if let Some(content) = files.get(&path) {
                let encoded = STANDARD.encode(content);
                let wrapped: Vec<String> = encoded
                    .as_bytes()
                    .chunks(60)
                    .map(|c| String::from_utf8_lossy(c).into_owned())
                    .collect();
                return Json(json!({
                    "type": "file",
                    "path": path,
                    "encoding": "base64",
                    "content": wrapped.join("\n"),
                }))
                .into_response();
            }
            let prefix = format!("{path}/");
            if files.keys().any(|k| k.starts_with(&prefix)) {
                return Json(json!([{ "type": "dir", "path": path }])).into_response();
            }
            not_found("Not Found")
        }

        async fn put_contents(
            State(fake): State<FakeGithub>,
            Path((_owner, _repo, path)): Path<(String, String, String)>,
            Json(body): Json<Value>,
        ) -> Response {
            let mut files = fake.files.lock().unwrap();
            if files.contains_key(&path) {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "message": "Invalid request.\n\n\"sha\" wasn't supplied." })),
                )
                    .into_response();
            }
            let content = body["content"].as_str().unwrap_or_default();
            let decoded = STANDARD.decode(content).unwrap();
            files.insert(path.clone(), String::from_utf8(decoded).unwrap());
            fake.puts.lock().unwrap().push(body);
            (StatusCode::CREATED, Json(json!({ "content": { "path": path } }))).into_response()
        }

        async fn get_tree(
            State(fake): State<FakeGithub>,
            Path((_owner, _repo, tree_ish)): Path<(String, String, String)>,
        ) -> Response {
            let Some((branch, dir)) = tree_ish.split_once(':') else {
                return not_found("Not Found");
            };
            if branch != "main" {
                return not_found("Not Found");
            }
            let prefix = format!("{dir}/");
            let files = fake.files.lock().unwrap();
            let mut blobs = BTreeSet::new();
            let mut trees = BTreeSet::new();
            for rest in files.keys().filter_map(|k| k.strip_prefix(&prefix)) {
                match rest.split_once('/') {
                    Some((sub, _)) => trees.insert(sub.to_string()),
                    None => blobs.insert(rest.to_string()),
                };
            }
            if blobs.is_empty() && trees.is_empty() {
                return not_found("Not Found");
            }
            let tree: Vec<Value> = blobs
                .iter()
                .map(|p| json!({ "path": p, "type": "blob", "mode": "100644" }))
                .chain(
                    trees
                        .iter()
                        .map(|p| json!({ "path": p, "type": "tree", "mode": "040000" })),
                )
                .collect();
            Json(json!({ "sha": "abc123", "tree": tree, "truncated": fake.truncate_trees }))
                .into_response()
        }

        async fn get_branch(Path((_owner, _repo, branch)): Path<(String, String, String)>) -> Response {
            if branch == "main" {
                Json(json!({ "name": "main" })).into_response()
            } else {
                not_found("Branch not found")
            }
        }

        async fn spawn(fake: FakeGithub) -> Url {
            let app = Router::new()
                .route(
                    "/repos/{owner}/{repo}/contents/{*path}",
                    get(get_contents).put(put_contents),
                )
                .route("/repos/{owner}/{repo}/git/trees/{tree}", get(get_tree))
                .route("/repos/{owner}/{repo}/branches/{branch}", get(get_branch))
                .layer(middleware::from_fn(require_token))
                .with_state(fake);
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            Url::parse(&format!("http://{addr}/")).unwrap()
        }

        fn client(api_base: Url, token: &str, branch: &str) -> GithubStore {
            let cfg = GithubConfig {
                api_base,
                branch: branch.to_string(),
                ..GithubConfig::default()
            };
            let target = GithubTarget {
                token: token.into(),
                owner: "mace-eu".into(),
                repo: "MACE-EU".into(),
            };
            GithubStore::new(target, &cfg).unwrap()
        }

        const PAGE_PATH: &str = "daily-verses/bible_verse_2025-08-05.html";

        #[tokio::test]
        async fn read_decodes_wrapped_content_and_maps_404_to_none() {
            let page = format!("<p>{}</p>", "യഹോവ എന്റെ ഇടയൻ ".repeat(20));
            let base = spawn(FakeGithub::default().with_file(PAGE_PATH, &page)).await;
            let store = client(base, TOKEN, "main");

            assert_eq!(store.read(PAGE_PATH).await.unwrap(), Some(page));
            assert!(store.exists(PAGE_PATH).await.unwrap());
            assert_eq!(
                store
                    .read("daily-verses/bible_verse_1999-01-01.html")
                    .await
                    .unwrap(),
                None
            );
        }

        #[tokio::test]
        async fn reading_a_directory_is_unexpected() {
            let base = spawn(FakeGithub::default().with_file(PAGE_PATH, "x")).await;
            let store = client(base, TOKEN, "main");
            assert!(matches!(
                store.read("daily-verses").await,
                Err(VerseError::UnexpectedResponse(_))
            ));
        }

        #[tokio::test]
        async fn list_reads_the_tree_and_maps_404_to_none() {
            let fake = FakeGithub::default()
                .with_file("daily-verses/bible_verse_2025-08-05.html", "a")
                .with_file("daily-verses/bible_verse_2024-12-31.html", "b")
                .with_file("daily-verses/archive/old.html", "c");
            let store = client(spawn(fake).await, TOKEN, "main");

            let entries = store.list("daily-verses").await.unwrap().unwrap();
            assert_eq!(
                entries,
                vec![
                    StoreEntry {
                        name: "bible_verse_2024-12-31.html".into(),
                        path: "daily-verses/bible_verse_2024-12-31.html".into(),
                        is_file: true,
                    },
                    StoreEntry {
                        name: "bible_verse_2025-08-05.html".into(),
                        path: "daily-verses/bible_verse_2025-08-05.html".into(),
                        is_file: true,
                    },
                    StoreEntry {
                        name: "archive".into(),
                        path: "daily-verses/archive".into(),
                        is_file: false,
                    },
                ]
            );
            assert_eq!(store.list("missing").await.unwrap(), None);
        }

        #[tokio::test]
        async fn truncated_listing_is_an_error() {
            let fake = FakeGithub {
                truncate_trees: true,
                ..FakeGithub::default()
            }
            .with_file(PAGE_PATH, "a");
            let store = client(spawn(fake).await, TOKEN, "main");
            assert!(matches!(
                store.list("daily-verses").await,
                Err(VerseError::UnexpectedResponse(_))
            ));
        }

        #[tokio::test]
        async fn write_sends_base64_content_on_branch_with_message() {
            let fake = FakeGithub::default();
            let store = client(spawn(fake.clone()).await, TOKEN, "main");

            store
                .write(PAGE_PATH, "<h3>Rest:</h3>", "Add daily verse for August 05, 2025 via API")
                .await
                .unwrap();

            let puts = fake.puts.lock().unwrap().clone();
            assert_eq!(puts.len(), 1);
            assert_eq!(puts[0]["branch"], "main");
            assert_eq!(
                puts[0]["message"],
                "Add daily verse for August 05, 2025 via API"
            );
            assert_eq!(puts[0]["content"], STANDARD.encode("<h3>Rest:</h3>"));
            assert_eq!(
                fake.files.lock().unwrap().get(PAGE_PATH).map(String::as_str),
                Some("<h3>Rest:</h3>")
            );
        }

        #[tokio::test]
        async fn rejected_write_passes_github_message_through() {
            let fake = FakeGithub::default().with_file(PAGE_PATH, "first");
            let store = client(spawn(fake).await, TOKEN, "main");

            match store.write(PAGE_PATH, "second", "again").await {
                Err(VerseError::Upstream { status, message }) => {
                    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
                    assert!(message.contains("\"sha\" wasn't supplied"));
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }

        #[tokio::test]
        async fn bad_token_is_an_upstream_error_not_absent() {
            let base = spawn(FakeGithub::default().with_file(PAGE_PATH, "x")).await;
            let store = client(base, "wrong", "main");

            match store.read(PAGE_PATH).await {
                Err(VerseError::Upstream { status, message }) => {
                    assert_eq!(status, StatusCode::UNAUTHORIZED);
                    assert_eq!(message, "Bad credentials");
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }

        #[tokio::test]
        async fn ping_checks_the_configured_branch() {
            let base = spawn(FakeGithub::default()).await;
            client(base.clone(), TOKEN, "main").ping().await.unwrap();

            match client(base, TOKEN, "gone").ping().await {
                Err(VerseError::Upstream { status, message }) => {
                    assert_eq!(status, StatusCode::NOT_FOUND);
                    assert_eq!(message, "Branch not found");
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }
}
