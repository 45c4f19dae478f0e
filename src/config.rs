use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Runtime configuration.
///
/// Sources, lowest precedence first:
/// - compiled defaults
/// - `config.toml` in the working directory (optional)
/// - `GITHUB_TOKEN`, `GITHUB_REPO_OWNER`, `GITHUB_REPO_NAME`
/// - `VERSE_*` environment variables for every other key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    pub loglevel: String,
    pub github: GithubConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub token: Option<String>,
    pub repo_owner: Option<String>,
    pub repo_name: Option<String>,
    pub branch: String,
    /// Repository directory holding one page per date.
    pub directory: String,
    pub api_base: Url,
    pub timeout_secs: u64,
    /// Outbound proxy for GitHub calls; ambient proxy variables are ignored.
    pub proxy: Option<Url>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5000".to_string(),
            loglevel: "info".to_string(),
            github: GithubConfig::default(),
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            repo_owner: None,
            repo_name: None,
            branch: "main".to_string(),
            directory: "daily-verses".to_string(),
            api_base: Url::parse("https://api.github.com/").expect("static GitHub API URL"),
            timeout_secs: 15,
            proxy: None,
        }
    }
}

/// Credentials and coordinates needed to reach the repository.
#[derive(Debug, Clone)]
pub struct GithubTarget {
    pub token: String,
    pub owner: String,
    pub repo: String,
}

impl GithubConfig {
    /// Returns `None` unless token, owner and name are all set and non-empty.
    pub fn target(&self) -> Option<GithubTarget> {
        fn non_empty(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.trim().is_empty())
        }
        Some(GithubTarget {
            token: non_empty(&self.token)?.to_string(),
            owner: non_empty(&self.repo_owner)?.to_string(),
            repo: non_empty(&self.repo_name)?.to_string(),
        })
    }
}

impl Config {
    pub fn figment() -> Figment {
        Self::figment_from(DEFAULT_CONFIG_FILE)
    }

    pub fn figment_from(path: &str) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(
                Env::raw()
                    .only(&["GITHUB_TOKEN", "GITHUB_REPO_OWNER", "GITHUB_REPO_NAME"])
                    .map(|key| match key.as_str().to_ascii_uppercase().as_str() {
                        "GITHUB_TOKEN" => "github.token".into(),
                        "GITHUB_REPO_OWNER" => "github.repo_owner".into(),
                        "GITHUB_REPO_NAME" => "github.repo_name".into(),
                        other => other.to_ascii_lowercase().into(),
                    }),
            )
            .merge(Env::prefixed("VERSE_").map(|key| {
                let key = key.as_str().to_ascii_lowercase();
                match key.as_str() {
                    "branch" | "directory" | "api_base" | "timeout_secs" | "proxy" => {
                        format!("github.{key}").into()
                    }
                    _ => key.into(),
                }
            }))
    }

    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }
}
