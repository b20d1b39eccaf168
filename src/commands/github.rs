//! GitHub REST adapter for discovery. Sequential, fixed delay between
//! requests, one immediate retry on network errors and 5xx responses.

use crate::analysis::discovery::RepoSearch;
use crate::commands::store::DayCache;
use crate::error::{Error, Result};
use crate::models::target::RawRepo;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::{Duration, Instant};

const GITHUB_API: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("catalog-scout/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<ApiRepo>,
}

#[derive(Debug, Deserialize)]
struct ApiOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiRepo {
    name: String,
    full_name: String,
    owner: ApiOwner,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    archived: bool,
    #[serde(default)]
    html_url: Option<String>,
}

impl From<ApiRepo> for RawRepo {
    fn from(repo: ApiRepo) -> Self {
        RawRepo {
            owner: repo.owner.login,
            name: repo.name,
            full_name: repo.full_name,
            description: repo.description,
            star_count: repo.stargazers_count,
            language: repo.language,
            topics: repo.topics,
            last_pushed_at: repo.pushed_at,
            archived: repo.archived,
            url: repo.html_url,
        }
    }
}

/// Per-run request state. Owned by the caller and threaded by `&mut`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RequestStats {
    pub requests: u32,
    pub retries: u32,
    pub cache_hits: u32,
    pub rate_limited: bool,
}

pub struct GithubSearch {
    http_client: reqwest::Client,
    token: Option<String>,
    per_page: u32,
    delay: Duration,
    last_request: Option<Instant>,
    cache: Option<DayCache>,
    pub stats: RequestStats,
}

impl GithubSearch {
    pub fn new(token: Option<String>, per_page: u32, delay: Duration, cache: Option<DayCache>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            token: token.filter(|t| !t.trim().is_empty()),
            per_page: per_page.clamp(1, 100),
            delay,
            last_request: None,
            cache,
            stats: RequestStats::default(),
        })
    }

    async fn pace(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }

    async fn get_json<T>(&mut self, url: &str, query: &[(&str, String)]) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        if self.stats.rate_limited {
            return Err(Error::RateLimited);
        }

        let mut retried = false;
        loop {
            self.pace().await;
            self.stats.requests += 1;

            let mut request = self
                .http_client
                .get(url)
                .query(query)
                .header("Accept", "application/vnd.github+json");
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) if !retried => {
                    log::warn!("GET {url} failed ({e}); retrying once");
                    retried = true;
                    self.stats.retries += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let status = response.status();
            if status.is_server_error() && !retried {
                log::warn!("GET {url} returned {status}; retrying once");
                retried = true;
                self.stats.retries += 1;
                continue;
            }

            if is_rate_limited(status, response.headers()) {
                self.stats.rate_limited = true;
                return Err(Error::RateLimited);
            }

            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(Error::Api {
                    status: status.as_u16(),
                    message: message.chars().take(200).collect(),
                });
            }

            return Ok(response.json::<T>().await?);
        }
    }
}

fn is_rate_limited(status: StatusCode, headers: &reqwest::header::HeaderMap) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    status == StatusCode::FORBIDDEN
        && headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim() == "0")
}

#[async_trait]
impl RepoSearch for GithubSearch {
    async fn search(&mut self, query: &str) -> Result<Vec<RawRepo>> {
        let cache_key = format!("search:{query}");
        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get::<Vec<RawRepo>>(&cache_key)) {
            self.stats.cache_hits += 1;
            return Ok(cached);
        }

        let url = format!("{GITHUB_API}/search/repositories");
        let params = [
            ("q", query.to_string()),
            ("sort", "stars".to_string()),
            ("per_page", self.per_page.to_string()),
        ];
        let response: SearchResponse = self.get_json(&url, &params).await?;
        let repos: Vec<RawRepo> = response.items.into_iter().map(RawRepo::from).collect();

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(&cache_key, &repos) {
                log::warn!("could not cache results for '{query}': {e}");
            }
        }
        Ok(repos)
    }

    async fn fetch_repo(&mut self, full_name: &str) -> Result<RawRepo> {
        let cache_key = format!("repo:{full_name}");
        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get::<RawRepo>(&cache_key)) {
            self.stats.cache_hits += 1;
            return Ok(cached);
        }

        let url = format!("{GITHUB_API}/repos/{full_name}");
        let repo: ApiRepo = self.get_json(&url, &[]).await?;
        let repo = RawRepo::from(repo);

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(&cache_key, &repo) {
                log::warn!("could not cache metadata for {full_name}: {e}");
            }
        }
        Ok(repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn maps_api_items_to_raw_repos() {
        let body = r#"{
            "items": [{
                "name": "ripgrep",
                "full_name": "BurntSushi/ripgrep",
                "owner": {"login": "BurntSushi"},
                "description": "recursively searches directories",
                "stargazers_count": 50000,
                "language": "Rust",
                "topics": ["cli", "search"],
                "pushed_at": "2026-10-01T00:00:00Z",
                "archived": false,
                "html_url": "https://github.com/BurntSushi/ripgrep"
            }]
        }"#;

        let response: SearchResponse = serde_json::from_str(body).unwrap();
        let repo = RawRepo::from(response.items.into_iter().next().unwrap());

        assert_eq!(repo.owner, "BurntSushi");
        assert_eq!(repo.full_name, "BurntSushi/ripgrep");
        assert_eq!(repo.star_count, 50000);
        assert_eq!(repo.topics, vec!["cli", "search"]);
        assert!(repo.last_pushed_at.is_some());
    }

    #[test]
    fn detects_rate_limit_responses() {
        let mut exhausted = HeaderMap::new();
        exhausted.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        let mut remaining = HeaderMap::new();
        remaining.insert("x-ratelimit-remaining", HeaderValue::from_static("12"));

        assert!(is_rate_limited(StatusCode::FORBIDDEN, &exhausted));
        assert!(!is_rate_limited(StatusCode::FORBIDDEN, &remaining));
        assert!(is_rate_limited(StatusCode::TOO_MANY_REQUESTS, &HeaderMap::new()));
    }

    #[tokio::test]
    async fn serves_cached_results_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let day = chrono::NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let cache = DayCache::new(dir.path(), day);
        let cached = vec![RawRepo {
            owner: "a".into(),
            name: "b".into(),
            full_name: "a/b".into(),
            ..RawRepo::default()
        }];
        cache.put("search:topic:cli", &cached).unwrap();

        let mut client = GithubSearch::new(None, 30, Duration::ZERO, Some(cache)).unwrap();
        let results = client.search("topic:cli").await.unwrap();

        assert_eq!(results, cached);
        assert_eq!(client.stats.cache_hits, 1);
        assert_eq!(client.stats.requests, 0);
    }

    #[tokio::test]
    async fn rate_limited_client_fails_fast() {
        let mut client = GithubSearch::new(None, 30, Duration::ZERO, None).unwrap();
        client.stats.rate_limited = true;

        let err = client.search("topic:cli").await.unwrap_err();
        assert!(matches!(err, Error::RateLimited));
        assert_eq!(client.stats.requests, 0);
    }
}
