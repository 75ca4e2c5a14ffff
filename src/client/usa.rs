//! North America storefront client
//!
//! Searches the store's Algolia index and scrapes the product page for the
//! long description. The index credentials are the public ones embedded in
//! the store's own frontend.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use super::{
    ClientError, PAGE_STATE, STORE_LINK_NAME, extract_first, fetch_html, http_client,
    parse_iso_date, rank_by_distance,
};
use crate::game::{Game, Link};

const ALGOLIA_APP_ID: &str = "U3B6GR4UA3";
const ALGOLIA_API_KEY: &str = "a29c6927638bfd8cee23993e51e721c9";
const SEARCH_INDEX: &str = "store_game_en_us";

static PRODUCT_DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<div class="ProductDetailstyles__Grid[^"]*"[^>]*>.*?<p[^>]*>(.*?)</p>"#)
        .unwrap()
});
static STATE_DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""description":"((?:[^"\\]|\\.)*)""#).unwrap());

#[derive(Debug, Deserialize)]
struct QueriesResponse {
    results: Option<Vec<IndexResult>>,
    #[serde(default)]
    status: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndexResult {
    #[serde(default)]
    hits: Vec<UsaHit>,
    #[serde(rename = "nbHits", default)]
    nb_hits: i64,
}

/// Raw search hit from the store index.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsaHit {
    title: String,
    #[serde(default)]
    nsuid: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    software_developer: Option<String>,
    #[serde(default)]
    software_publisher: Option<String>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    franchises: Vec<String>,
    #[serde(default)]
    esrb_rating: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    product_image: Option<String>,
}

fn parse_usa_game(hit: UsaHit) -> Game {
    let mut game = Game {
        nsuid: hit.nsuid,
        title: Game::clean_title(&hit.title),
        full_description: hit.description.unwrap_or_default(),
        release_date: hit.release_date.as_deref().and_then(parse_iso_date),
        genres: hit.genres,
        series: hit.franchises,
        ..Default::default()
    };

    if let Some(dev) = hit.software_developer.filter(|d| !d.is_empty()) {
        game.developers.push(dev);
    }
    if let Some(publisher) = hit.software_publisher.filter(|p| !p.is_empty()) {
        game.publishers.push(publisher);
    }
    if let Some(rating) = hit.esrb_rating.filter(|r| !r.is_empty()) {
        game.age_ratings.push(format!("ESRB {}", rating));
    }
    if let Some(url) = hit.url {
        game.links.push(Link::new(
            STORE_LINK_NAME,
            format!("https://www.nintendo.com{}", url),
        ));
    }
    if let Some(image) = hit.product_image {
        game.cover_image = Some(format!(
            "https://assets.nintendo.com/image/upload/ar_1:1,c_lpad/b_white/f_auto/q_auto/dpr_1.5/c_scale,w_500/{}",
            image
        ));
        game.landscape_image = Some(format!(
            "https://assets.nintendo.com/image/upload/ar_16:9,b_auto:border,c_lpad/b_white/f_auto/q_auto/dpr_1.5/c_scale,w_700/{}",
            image
        ));
    }

    game.refresh_summary();
    game
}

/// The page-state description arrives inside a fixed-length HTML shell;
/// dropping the first 3 and last 4 characters removes it. Depends on the
/// current upstream page format.
fn strip_fixed_wrapper(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        chars[3..chars.len() - 4].iter().collect()
    } else {
        s.to_string()
    }
}

/// Long description from the product page: the product-detail paragraph when
/// the page renders one, otherwise the last `description` entry of the
/// inlined page-state blob.
fn extract_description(html: &str) -> Option<String> {
    if let Some(paragraph) = extract_first(&PRODUCT_DESCRIPTION, html) {
        return Some(paragraph);
    }

    let state = extract_first(&PAGE_STATE, html)?;
    let matches: Vec<&str> = STATE_DESCRIPTION
        .captures_iter(&state)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if matches.len() < 2 {
        return None;
    }

    let unescaped: String = serde_json::from_str(&format!("\"{}\"", matches[matches.len() - 1])).ok()?;
    Some(strip_fixed_wrapper(&unescaped))
}

pub struct UsaClient {
    client: reqwest::Client,
}

impl UsaClient {
    const SEARCH_URL: &'static str = "https://U3B6GR4UA3-2.algolia.net/1/indexes/*/queries";

    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }

    pub async fn search_games(&self, normalized_query: &str) -> Vec<Game> {
        match self.try_search(normalized_query).await {
            Ok(mut games) => {
                rank_by_distance(&mut games, normalized_query);
                games
            }
            Err(e) => {
                tracing::warn!("USA search failed for {:?}: {:#}", normalized_query, e);
                Vec::new()
            }
        }
    }

    async fn try_search(&self, normalized_query: &str) -> Result<Vec<Game>> {
        let body = json!({
            "requests": [{
                "indexName": SEARCH_INDEX,
                "query": normalized_query,
                "params": "hitsPerPage=10",
            }]
        });

        tracing::debug!("Searching USA store index for {:?}", normalized_query);

        let response = self
            .client
            .post(Self::SEARCH_URL)
            .header("X-Algolia-API-Key", ALGOLIA_API_KEY)
            .header("X-Algolia-Application-Id", ALGOLIA_APP_ID)
            .json(&body)
            .send()
            .await
            .context("Failed to query USA store index")?;

        let data: QueriesResponse = response
            .json()
            .await
            .context("Failed to parse USA search response")?;

        let Some(results) = data.results else {
            return Err(ClientError::Api {
                code: data.status.map(|s| s.to_string()).unwrap_or_default(),
                message: data.message.unwrap_or_default(),
            }
            .into());
        };

        let result = results.into_iter().next().context("Empty results array")?;
        tracing::debug!("{} hits for {:?}", result.nb_hits, normalized_query);

        Ok(result.hits.into_iter().map(parse_usa_game).collect())
    }

    pub async fn get_game_details(&self, game: Game) -> Game {
        let Some(link) = game.store_link(STORE_LINK_NAME).cloned() else {
            return game;
        };

        let mut game = game;
        match self.try_get_details(&link.url).await {
            Ok(Some(description)) => game.full_description = description,
            Ok(None) => tracing::debug!("No description found on {}", link.url),
            Err(e) => tracing::warn!("USA detail scrape failed for {}: {:#}", link.url, e),
        }
        game
    }

    async fn try_get_details(&self, url: &str) -> Result<Option<String>> {
        let html = fetch_html(&self.client, url).await?;
        Ok(extract_description(&html))
    }
}

impl Default for UsaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_hit() -> UsaHit {
        serde_json::from_value(json!({
            "title": "Super Mario Odyssey™",
            "nsuid": "70010000000127",
            "description": "Explore incredible places far from the Mushroom Kingdom!",
            "releaseDate": "2017-10-27T00:00:00.000-07:00",
            "softwareDeveloper": "Nintendo",
            "softwarePublisher": "Nintendo",
            "genres": ["Action", "Platformer"],
            "franchises": ["Mario"],
            "esrbRating": "Everyone 10+",
            "url": "/store/products/super-mario-odyssey-switch/",
            "productImage": "ncom/software/switch/70010000000127/box"
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_full_hit() {
        let game = parse_usa_game(sample_hit());
        assert_eq!(game.title, "Super Mario Odyssey");
        assert_eq!(game.name, "Super Mario Odyssey");
        assert_eq!(game.nsuid.as_deref(), Some("70010000000127"));
        assert_eq!(
            game.release_date,
            chrono::NaiveDate::from_ymd_opt(2017, 10, 27)
        );
        assert_eq!(game.developers, vec!["Nintendo"]);
        assert_eq!(game.publishers, vec!["Nintendo"]);
        assert_eq!(game.genres, vec!["Action", "Platformer"]);
        assert_eq!(game.series, vec!["Mario"]);
        assert_eq!(game.age_ratings, vec!["ESRB Everyone 10+"]);
        assert_eq!(game.summary, "2017-10-27 | Nintendo");
        assert_eq!(
            game.links[0].url,
            "https://www.nintendo.com/store/products/super-mario-odyssey-switch/"
        );
        assert!(game.cover_image.is_some());
        assert!(game.landscape_image.is_some());
    }

    #[test]
    fn test_parse_sparse_hit_defaults_collections() {
        let game: Game = parse_usa_game(serde_json::from_value(json!({"title": "Mystery"})).unwrap());
        assert_eq!(game.title, "Mystery");
        assert!(game.developers.is_empty());
        assert!(game.publishers.is_empty());
        assert!(game.genres.is_empty());
        assert!(game.series.is_empty());
        assert!(game.age_ratings.is_empty());
        assert!(game.links.is_empty());
        assert!(game.release_date.is_none());
        assert!(game.cover_image.is_none());
    }

    #[tokio::test]
    async fn test_details_without_store_link_return_game_unchanged() {
        let client = UsaClient::new();
        let game = parse_usa_game(serde_json::from_value(json!({"title": "Mystery"})).unwrap());
        let out = client.get_game_details(game).await;
        assert_eq!(out.title, "Mystery");
        assert!(out.full_description.is_empty());
    }

    #[test]
    fn test_strip_fixed_wrapper() {
        assert_eq!(strip_fixed_wrapper("<p>An odyssey awaits.</p>"), "An odyssey awaits.");
        // Too short to carry the wrapper: returned untouched.
        assert_eq!(strip_fixed_wrapper("abc"), "abc");
    }

    #[test]
    fn test_extract_description_prefers_rendered_paragraph() {
        let html = r#"<div class="ProductDetailstyles__Grid-sc-4l5ex7-4 hKLOzA"><h2>About</h2><p>Rendered description.</p></div>"#;
        assert_eq!(
            extract_description(html).as_deref(),
            Some("Rendered description.")
        );
    }

    #[test]
    fn test_extract_description_falls_back_to_page_state() {
        let html = concat!(
            r#"<script id="__NEXT_DATA__" type="application/json">"#,
            r#"{"meta":{"description":"Short teaser"},"#,
            r#""product":{"description":"<p>Cap off an odyssey!</p>"}}"#,
            "</script>"
        );
        assert_eq!(
            extract_description(html).as_deref(),
            Some("Cap off an odyssey!")
        );
    }

    #[test]
    fn test_extract_description_requires_multiple_state_matches() {
        let html = r#"<script id="__NEXT_DATA__">{"description":"only one"}</script>"#;
        assert_eq!(extract_description(html), None);
    }
}
