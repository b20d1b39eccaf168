use crate::error::Result;
use crate::models::settings::TargetSettings;
use crate::models::target::{Candidate, DiscoveryError, DiscoveryQuery, RawRepo, Strategy};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Number of a seed repo's topics expanded into follow-up searches.
const SEED_TOPIC_FANOUT: usize = 3;

/// External repository search. Implementations own any request bookkeeping.
#[async_trait]
pub trait RepoSearch: Send {
    async fn search(&mut self, query: &str) -> Result<Vec<RawRepo>>;
    async fn fetch_repo(&mut self, full_name: &str) -> Result<RawRepo>;
}

/// Candidates keyed by lower-cased full name, plus the funnel's raw count and any errors.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOutcome {
    pub candidates: BTreeMap<String, Candidate>,
    pub raw_count: usize,
    pub errors: Vec<DiscoveryError>,
}

pub fn build_queries(targets: &TargetSettings) -> Vec<DiscoveryQuery> {
    let mut queries = Vec::new();
    let mut push = |strategy: Strategy, label: &str, query: String| {
        let label = label.trim();
        if !label.is_empty() {
            queries.push(DiscoveryQuery {
                strategy,
                label: label.to_string(),
                query,
            });
        }
    };

    for topic in &targets.topics {
        push(Strategy::Topic, topic, format!("topic:{}", topic.trim()));
    }
    for keyword in &targets.keywords {
        push(Strategy::Keyword, keyword, format!("{} in:name,description", keyword.trim()));
    }
    for product in &targets.comparables {
        push(Strategy::Comparable, product, format!("{} in:description,readme", product.trim()));
    }
    for org in &targets.signal_orgs {
        push(Strategy::Signal, org, format!("user:{}", org.trim()));
    }

    queries
}

/// Run every query, then expand seed repos by their topics. One failing query
/// never stops the rest; its error is recorded and discovery moves on.
pub async fn discover<S>(searcher: &mut S, queries: &[DiscoveryQuery], seed_repos: &[String]) -> DiscoveryOutcome
where
    S: RepoSearch + ?Sized,
{
    let mut outcome = DiscoveryOutcome::default();

    for query in queries {
        run_query(searcher, query, &mut outcome).await;
    }

    for seed in seed_repos.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let repo = match searcher.fetch_repo(seed).await {
            Ok(repo) => repo,
            Err(e) => {
                log::warn!("seed {seed} could not be fetched: {e}");
                outcome.errors.push(DiscoveryError {
                    strategy: Strategy::Seed.as_str().to_string(),
                    query: seed.to_string(),
                    message: e.to_string(),
                });
                continue;
            }
        };

        for topic in repo.topics.iter().take(SEED_TOPIC_FANOUT) {
            let query = DiscoveryQuery {
                strategy: Strategy::Seed,
                label: seed.to_string(),
                query: format!("topic:{topic}"),
            };
            run_query(searcher, &query, &mut outcome).await;
        }
    }

    log::info!(
        "discovery: {} raw results, {} unique, {} errors",
        outcome.raw_count,
        outcome.candidates.len(),
        outcome.errors.len()
    );
    outcome
}

async fn run_query<S>(searcher: &mut S, query: &DiscoveryQuery, outcome: &mut DiscoveryOutcome)
where
    S: RepoSearch + ?Sized,
{
    match searcher.search(&query.query).await {
        Ok(items) => {
            log::debug!("{} -> {} results", query.query, items.len());
            outcome.raw_count += items.len();
            for item in items {
                merge_raw(&mut outcome.candidates, item, query.reason());
            }
        }
        Err(e) => {
            log::warn!("query '{}' failed: {e}", query.query);
            outcome.errors.push(DiscoveryError {
                strategy: query.strategy.as_str().to_string(),
                query: query.query.clone(),
                message: e.to_string(),
            });
        }
    }
}

/// Insert a raw item, or append the reason to the existing candidate.
pub fn merge_raw(candidates: &mut BTreeMap<String, Candidate>, raw: RawRepo, reason: String) {
    let candidate = Candidate::from_raw(raw, reason.clone());
    let key = candidate.full_name.to_lowercase();
    match candidates.get_mut(&key) {
        Some(existing) => existing.add_reason(reason),
        None => {
            candidates.insert(key, candidate);
        }
    }
}

/// Compiled exclusion rules: denylist globs, publisher-owned accounts, archived repos.
pub struct ExclusionRules {
    denylist: Vec<glob::Pattern>,
    publisher_accounts: Vec<String>,
}

impl ExclusionRules {
    pub fn from_settings(targets: &TargetSettings) -> Self {
        let denylist = targets
            .denylist
            .iter()
            .filter_map(|entry| {
                let lowered = entry.trim().to_lowercase();
                glob::Pattern::new(&lowered)
                    .or_else(|e| {
                        log::warn!("denylist entry '{entry}' is not a valid pattern ({e}); matching literally");
                        glob::Pattern::new(&glob::Pattern::escape(&lowered))
                    })
                    .ok()
            })
            .collect();

        Self {
            denylist,
            publisher_accounts: targets
                .publisher_accounts
                .iter()
                .map(|a| a.trim().to_lowercase())
                .collect(),
        }
    }

    pub fn excludes(&self, candidate: &Candidate) -> bool {
        if candidate.archived {
            return true;
        }
        let owner = candidate.owner.to_lowercase();
        if self.publisher_accounts.contains(&owner) {
            return true;
        }
        let full_name = candidate.full_name.to_lowercase();
        self.denylist
            .iter()
            .any(|pattern| pattern.matches(&full_name) || pattern.matches(&owner))
    }
}

pub fn apply_exclusions(candidates: BTreeMap<String, Candidate>, rules: &ExclusionRules) -> Vec<Candidate> {
    candidates
        .into_values()
        .filter(|candidate| !rules.excludes(candidate))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::collections::HashMap;

    fn raw(full_name: &str) -> RawRepo {
        let (owner, name) = full_name.split_once('/').unwrap();
        RawRepo {
            owner: owner.to_string(),
            name: name.to_string(),
            full_name: full_name.to_string(),
            star_count: 10,
            ..RawRepo::default()
        }
    }

    struct FakeSearch {
        results: HashMap<String, Vec<RawRepo>>,
        repos: HashMap<String, RawRepo>,
        calls: Vec<String>,
    }

    #[async_trait]
    impl RepoSearch for FakeSearch {
        async fn search(&mut self, query: &str) -> Result<Vec<RawRepo>> {
            self.calls.push(query.to_string());
            self.results.get(query).cloned().ok_or(Error::Api {
                status: 422,
                message: format!("no fixture for {query}"),
            })
        }

        async fn fetch_repo(&mut self, full_name: &str) -> Result<RawRepo> {
            self.repos.get(full_name).cloned().ok_or(Error::Api {
                status: 404,
                message: "Not Found".to_string(),
            })
        }
    }

    fn targets() -> TargetSettings {
        TargetSettings {
            topics: vec!["cli".to_string()],
            keywords: vec!["terminal".to_string()],
            comparables: vec![" ".to_string()],
            signal_orgs: vec!["acme".to_string()],
            ..TargetSettings::default()
        }
    }

    #[test]
    fn builds_one_query_per_non_empty_label() {
        let queries = build_queries(&targets());
        let texts: Vec<&str> = queries.iter().map(|q| q.query.as_str()).collect();

        assert_eq!(
            texts,
            vec!["topic:cli", "terminal in:name,description", "user:acme"]
        );
        assert_eq!(queries[0].reason(), "topic:cli");
    }

    #[test]
    fn rediscovery_appends_reason_once() {
        let mut map = BTreeMap::new();
        merge_raw(&mut map, raw("BurntSushi/ripgrep"), "topic:cli".to_string());
        merge_raw(&mut map, raw("burntsushi/ripgrep"), "keyword:search".to_string());
        merge_raw(&mut map, raw("BurntSushi/ripgrep"), "topic:cli".to_string());

        assert_eq!(map.len(), 1);
        let candidate = map.values().next().unwrap();
        assert_eq!(candidate.full_name, "BurntSushi/ripgrep");
        assert_eq!(candidate.why_matched, vec!["topic:cli", "keyword:search"]);
    }

    #[test]
    fn exclusions_cover_denylist_publisher_and_archived() {
        let settings = TargetSettings {
            denylist: vec!["spam-org/*".to_string(), "Blocked".to_string()],
            publisher_accounts: vec!["OurOrg".to_string()],
            ..TargetSettings::default()
        };
        let rules = ExclusionRules::from_settings(&settings);

        let mut map = BTreeMap::new();
        for name in ["spam-org/x", "blocked/tool", "ourorg/site", "good/tool", "old/tool"] {
            merge_raw(&mut map, raw(name), "topic:cli".to_string());
        }
        map.get_mut("old/tool").unwrap().archived = true;

        let kept = apply_exclusions(map, &rules);
        let names: Vec<&str> = kept.iter().map(|c| c.full_name.as_str()).collect();
        assert_eq!(names, vec!["good/tool"]);
    }

    #[tokio::test]
    async fn failing_strategies_do_not_abort_discovery() {
        let mut seed = raw("seed/project");
        seed.topics = vec!["tui".to_string(), "rust".to_string()];

        let mut searcher = FakeSearch {
            results: HashMap::from([
                ("topic:cli".to_string(), vec![raw("a/one"), raw("b/two")]),
                ("user:acme".to_string(), vec![raw("acme/tool"), raw("a/one")]),
                ("topic:tui".to_string(), vec![raw("b/two")]),
                ("topic:rust".to_string(), vec![]),
            ]),
            repos: HashMap::from([("seed/project".to_string(), seed)]),
            calls: Vec::new(),
        };

        let queries = build_queries(&targets());
        let seeds = vec!["seed/project".to_string(), "gone/repo".to_string()];
        let outcome = discover(&mut searcher, &queries, &seeds).await;

        assert_eq!(outcome.raw_count, 5);
        assert_eq!(outcome.candidates.len(), 3);
        assert_eq!(outcome.errors.len(), 2);
        assert!(outcome.errors.iter().any(|e| e.strategy == "keyword"));
        assert!(outcome.errors.iter().any(|e| e.strategy == "seed" && e.query == "gone/repo"));
        assert_eq!(
            outcome.candidates["a/one"].why_matched,
            vec!["topic:cli", "signal:acme"]
        );
        assert_eq!(
            outcome.candidates["b/two"].why_matched,
            vec!["topic:cli", "seed:seed/project"]
        );
        assert_eq!(searcher.calls.len(), 5);
    }
}
