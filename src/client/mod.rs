//! Region-specific storefront clients
//!
//! Each region speaks its own ad-hoc search/detail protocol; the endpoints
//! are unofficial services whose shapes were discovered by observation. The
//! [`RegionClient`] enum is the only surface the orchestrator sees: the
//! variant set is closed, so dispatch is a match, not a trait hierarchy.
//!
//! Search and detail failures never propagate: a failed search is an empty
//! result list, a failed enrichment returns the game as-is.

pub mod asia;
pub mod europe;
pub mod japan;
pub mod usa;

use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;

use crate::game::Game;
use crate::matching::name_distance;
use crate::settings::{NintendoPlatform, StoreRegion};

/// Link name the detail scrapes follow back to the store page.
pub const STORE_LINK_NAME: &str = "My Nintendo Store";

/// Structured failures raised inside client internals; callers catch these
/// at the client boundary and degrade to empty or partial results.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Upstream returned an explicit error payload instead of results.
    #[error("storefront API error: [{code}] {message}")]
    Api { code: String, message: String },
    /// A detail scrape needed a title code embedded in the store URL and the
    /// expected pattern was not there. Hard precondition; aborts only the
    /// enrichment step for this candidate.
    #[error("no title code found in store link: {0}")]
    MissingStoreIdentifier(String),
}

static WHITESPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());
static CLASS_ATTRIBUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#" class="[^"]*""#).unwrap());

/// Embedded page-state JSON island on the store's rendered pages.
pub(crate) static PAGE_STATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<script id="__NEXT_DATA__"[^>]*>(.*?)</script>"#).unwrap());

/// Storefront region clients behind one capability set: `search_games` and
/// `get_game_details`.
pub enum RegionClient {
    Usa(usa::UsaClient),
    Europe(europe::EuropeClient),
    Japan(japan::JapanClient),
    Asia(asia::AsiaClient),
}

impl RegionClient {
    pub fn new(region: StoreRegion, platform: NintendoPlatform) -> Self {
        match region {
            StoreRegion::Usa => RegionClient::Usa(usa::UsaClient::new()),
            StoreRegion::Europe => RegionClient::Europe(europe::EuropeClient::new(platform)),
            StoreRegion::Japan => RegionClient::Japan(japan::JapanClient::new()),
            StoreRegion::Asia => RegionClient::Asia(asia::AsiaClient::new()),
        }
    }

    /// Search the region storefront. Ordering is region-specific but
    /// deterministic for identical inputs; failures yield an empty list.
    pub async fn search_games(&self, normalized_query: &str) -> Vec<Game> {
        match self {
            RegionClient::Usa(c) => c.search_games(normalized_query).await,
            RegionClient::Europe(c) => c.search_games(normalized_query).await,
            RegionClient::Japan(c) => c.search_games(normalized_query).await,
            RegionClient::Asia(c) => c.search_games(normalized_query).await,
        }
    }

    /// Enrich a matched game with fields the search payload lacks, typically
    /// the long description and genres. Returns the input unchanged when no
    /// store link is present; a partially enriched game on failure.
    pub async fn get_game_details(&self, game: Game) -> Game {
        match self {
            RegionClient::Usa(c) => c.get_game_details(game).await,
            RegionClient::Europe(c) => c.get_game_details(game).await,
            RegionClient::Japan(c) => c.get_game_details(game).await,
            RegionClient::Asia(c) => c.get_game_details(game).await,
        }
    }
}

/// Shared HTTP client construction; one client per region client instance,
/// request-scoped and cheap.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("nintendo-metadata/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to create HTTP client")
}

/// Fetch a page body for scraping.
pub(crate) async fn fetch_html(client: &reqwest::Client, url: &str) -> Result<String> {
    tracing::debug!("Fetching page {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Page fetch failed: {} - {}", response.status(), url);
    }

    response
        .text()
        .await
        .with_context(|| format!("Failed to read body of {}", url))
}

/// Remove runs of two or more whitespace characters from scraped HTML.
pub(crate) fn collapse_whitespace(html: &str) -> String {
    WHITESPACE_RUNS.replace_all(html, "").into_owned()
}

/// Drop `class="..."` attributes from scraped HTML fragments.
pub(crate) fn strip_class_attributes(html: &str) -> String {
    CLASS_ATTRIBUTES.replace_all(html, "").into_owned()
}

/// Parse the date portion of an ISO-8601 timestamp.
pub(crate) fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok()
}

/// First capture group of the first match, if any.
pub(crate) fn extract_first(re: &Regex, html: &str) -> Option<String> {
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Order results by ascending edit distance to the query. Stable, so ties
/// keep the storefront's own order.
pub(crate) fn rank_by_distance(games: &mut [Game], normalized_query: &str) {
    games.sort_by_key(|g| name_distance(normalized_query, &g.name.to_lowercase()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("<p>a</p>\n    <p>b</p>"), "<p>a</p><p>b</p>");
        assert_eq!(collapse_whitespace("one two"), "one two");
    }

    #[test]
    fn test_strip_class_attributes() {
        assert_eq!(
            strip_class_attributes(r#"<div class="a b"><span class="c">x</span></div>"#),
            "<div><span>x</span></div>"
        );
    }

    #[test]
    fn test_rank_by_distance_is_ascending_and_stable() {
        let mut games: Vec<Game> = ["Mario Party", "Super Mario Odyssey", "Mario Kart 8"]
            .iter()
            .map(|n| Game {
                name: n.to_string(),
                ..Default::default()
            })
            .collect();
        rank_by_distance(&mut games, "super mario odyssey");
        assert_eq!(games[0].name, "Super Mario Odyssey");
    }
}
