//! Asia (Singapore) storefront client
//!
//! The storefront exposes no server-side search: the client pulls the full
//! game listing and filters it locally by query-token overlap. Detail
//! enrichment walks a fallback chain — the page-state JSON island when the
//! hit links straight to its store entry, otherwise the landing page's
//! overview markup, otherwise a per-title API call keyed by the title code
//! embedded in the URL path.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

use super::{
    ClientError, PAGE_STATE, STORE_LINK_NAME, collapse_whitespace, extract_first, fetch_html,
    http_client, parse_iso_date, strip_class_attributes,
};
use crate::game::{Game, Link};
use crate::matching::query_words;

static OVERVIEW_CONTENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<div class="overview-content"[^>]*>(.*?)</div>"#).unwrap());
static OUTLINE_GENRES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<dl class="[^"]*detail-foot-outline-desc--flex[^"]*"[^>]*>.*?<p class="detail-foot-outline-txt"[^>]*>(.*?)</p>"#,
    )
    .unwrap()
});
static SPAN_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<span[^>]*>(.*?)</span>").unwrap());
static TITLE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"switch/(.*?)/index\.html").unwrap());
static NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r\n?|\n").unwrap());

#[derive(Debug, Deserialize)]
struct ListingResponse {
    result: Option<ListingBody>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ListingBody {
    #[serde(default)]
    items: Vec<AsiaHit>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
}

/// Raw listing entry; the listing carries only a thin summary per game.
#[derive(Debug, Deserialize)]
struct AsiaHit {
    #[serde(alias = "name")]
    title: String,
    #[serde(default)]
    nsuid: Option<String>,
    #[serde(default, alias = "url")]
    link: Option<String>,
    #[serde(default, alias = "thumbnail")]
    image: Option<String>,
    #[serde(default, alias = "releaseDate", alias = "release_date")]
    date: Option<String>,
    #[serde(default)]
    publisher: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TitleDetailResponse {
    detail: Option<TitleDetail>,
}

#[derive(Debug, Deserialize)]
struct TitleDetail {
    #[serde(default)]
    common: TitleCommon,
}

#[derive(Debug, Default, Deserialize)]
struct TitleCommon {
    #[serde(default)]
    genre: Vec<String>,
}

fn parse_asia_game(hit: AsiaHit) -> Game {
    let mut game = Game {
        nsuid: hit.nsuid,
        title: Game::clean_title(&hit.title),
        release_date: hit.date.as_deref().and_then(parse_iso_date),
        cover_image: hit.image,
        ..Default::default()
    };

    if let Some(publisher) = hit.publisher.filter(|p| !p.is_empty()) {
        game.publishers.push(publisher);
    }
    if let Some(link) = hit.link {
        let url = if link.starts_with("http") {
            link
        } else {
            format!("https://www.nintendo.com{}", link)
        };
        game.links.push(Link::new(STORE_LINK_NAME, url));
    }

    game.refresh_summary();
    game
}

/// Keep hits matching any query token, ordered descending by token-match
/// count. Stable sort, so equal counts keep listing order.
fn filter_by_token_overlap(games: Vec<Game>, normalized_query: &str) -> Vec<Game> {
    let words = query_words(normalized_query);
    if words.is_empty() {
        return Vec::new();
    }

    let pattern = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    let Ok(any_token) = Regex::new(&pattern) else {
        return Vec::new();
    };

    let mut scored: Vec<(usize, Game)> = games
        .into_iter()
        .filter_map(|g| {
            let count = any_token.find_iter(&g.name.to_lowercase()).count();
            (count > 0).then_some((count, g))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    scored.into_iter().map(|(_, g)| g).collect()
}

pub struct AsiaClient {
    client: reqwest::Client,
}

impl AsiaClient {
    const BASE_URL: &'static str = "https://www.nintendo.com/sg";

    pub fn new() -> Self {
        Self {
            client: http_client(),
        }
    }

    pub async fn search_games(&self, normalized_query: &str) -> Vec<Game> {
        match self.try_search().await {
            Ok(games) => filter_by_token_overlap(games, normalized_query),
            Err(e) => {
                tracing::warn!("Asia search failed for {:?}: {:#}", normalized_query, e);
                Vec::new()
            }
        }
    }

    /// The listing endpoint takes no query; filtering happens client-side.
    async fn try_search(&self) -> Result<Vec<Game>> {
        let url = format!("{}/api/v1/games/all", Self::BASE_URL);
        tracing::debug!("Fetching Asia store listing");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch Asia store listing")?;

        let data: ListingResponse = response
            .json()
            .await
            .context("Failed to parse Asia listing response")?;

        let Some(body) = data.result else {
            let error = data.error.unwrap_or(ApiError {
                code: 0,
                msg: String::new(),
            });
            return Err(ClientError::Api {
                code: error.code.to_string(),
                message: error.msg,
            }
            .into());
        };

        tracing::debug!("{} games in Asia listing", body.items.len());

        Ok(body.items.into_iter().map(parse_asia_game).collect())
    }

    pub async fn get_game_details(&self, game: Game) -> Game {
        let Some(link) = game.links.first().cloned() else {
            return game;
        };

        let mut game = game;
        if let Err(e) = self.enrich(&mut game, &link.url).await {
            match e.downcast_ref::<ClientError>() {
                Some(ClientError::MissingStoreIdentifier(_)) => {
                    tracing::error!("Asia detail enrichment aborted: {:#}", e);
                }
                _ => tracing::warn!("Asia detail scrape failed for {}: {:#}", link.url, e),
            }
        }
        game
    }

    async fn enrich(&self, game: &mut Game, url: &str) -> Result<()> {
        // Store entries keyed by NSUID render from a page-state island.
        if game.nsuid.as_deref().is_some_and(|id| url.contains(id)) {
            let html = fetch_html(&self.client, url).await?;
            let state =
                extract_first(&PAGE_STATE, &html).context("No page-state island on store entry")?;
            let data: serde_json::Value =
                serde_json::from_str(&state).context("Failed to parse page state")?;

            let post = &data["props"]["pageProps"]["post"];
            if let Some(text) = post["text"].as_str() {
                game.full_description = NEWLINES.replace_all(text, "<br>").into_owned();
            }
            if let Some(genres) = post["common"]["genre"].as_array() {
                game.genres
                    .extend(genres.iter().filter_map(|v| v.as_str().map(String::from)));
            }
            return Ok(());
        }

        // Landing page with rendered overview markup.
        let html = fetch_html(&self.client, url).await?;
        if let Some(overview) = extract_first(&OVERVIEW_CONTENT, &html) {
            game.full_description = collapse_whitespace(&strip_class_attributes(&overview));
        }
        if let Some(genre_block) = extract_first(&OUTLINE_GENRES, &html) {
            game.genres.extend(
                SPAN_TEXT
                    .captures_iter(&genre_block)
                    .map(|c| c[1].replace(',', "").trim().to_string())
                    .filter(|g| !g.is_empty()),
            );
            return Ok(());
        }

        // Last resort: per-title API keyed by the code in the URL path.
        let code = extract_first(&TITLE_CODE, url)
            .ok_or_else(|| ClientError::MissingStoreIdentifier(url.to_string()))?;
        game.genres.extend(self.fetch_title_genres(&code).await?);
        Ok(())
    }

    async fn fetch_title_genres(&self, code: &str) -> Result<Vec<String>> {
        let url = format!("{}/api/v1/switch/{}", Self::BASE_URL, urlencoding::encode(code));

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to query Asia title detail")?;

        let data: TitleDetailResponse = response
            .json()
            .await
            .context("Failed to parse Asia title detail")?;

        let detail = data.detail.ok_or_else(|| ClientError::Api {
            code: code.to_string(),
            message: "title code not found".to_string(),
        })?;

        Ok(detail.common.genre)
    }
}

impl Default for AsiaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn named(names: &[&str]) -> Vec<Game> {
        names
            .iter()
            .map(|n| Game {
                name: n.to_string(),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_parse_hit_with_relative_link() {
        let hit: AsiaHit = serde_json::from_value(json!({
            "title": "Splatoon 3",
            "nsuid": "70010000046394",
            "link": "/sg/games/switch/70010000046394",
            "image": "https://assets.nintendo.com.sg/splatoon3.jpg",
            "releaseDate": "2022-09-09",
            "publisher": "Nintendo"
        }))
        .unwrap();
        let game = parse_asia_game(hit);
        assert_eq!(game.title, "Splatoon 3");
        assert_eq!(
            game.links[0].url,
            "https://www.nintendo.com/sg/games/switch/70010000046394"
        );
        assert_eq!(
            game.release_date,
            chrono::NaiveDate::from_ymd_opt(2022, 9, 9)
        );
        assert_eq!(game.publishers, vec!["Nintendo"]);
    }

    #[test]
    fn test_parse_sparse_hit_defaults_collections() {
        let hit: AsiaHit = serde_json::from_value(json!({"title": "Mystery"})).unwrap();
        let game = parse_asia_game(hit);
        assert!(game.links.is_empty());
        assert!(game.publishers.is_empty());
        assert!(game.genres.is_empty());
    }

    #[test]
    fn test_token_filter_keeps_any_match_and_orders_by_count() {
        let games = named(&["Kirby's Dream Buffet", "Super Mario Party", "Mario Party Superstars", "Super Mario Odyssey"]);
        let filtered = filter_by_token_overlap(games, "super mario odyssey");
        assert_eq!(filtered.len(), 3);
        assert_eq!(filtered[0].name, "Super Mario Odyssey");
        // Two token matches each, listing order preserved.
        assert_eq!(filtered[1].name, "Super Mario Party");
        assert_eq!(filtered[2].name, "Mario Party Superstars");
    }

    #[test]
    fn test_token_filter_empty_query_matches_nothing() {
        let games = named(&["Super Mario Odyssey"]);
        assert!(filter_by_token_overlap(games, "").is_empty());
    }

    #[tokio::test]
    async fn test_details_without_any_link_return_game_unchanged() {
        let client = AsiaClient::new();
        let hit: AsiaHit = serde_json::from_value(json!({"title": "Mystery"})).unwrap();
        let out = client.get_game_details(parse_asia_game(hit)).await;
        assert_eq!(out.title, "Mystery");
        assert!(out.genres.is_empty());
    }

    #[test]
    fn test_title_code_extraction() {
        assert_eq!(
            extract_first(&TITLE_CODE, "https://www.nintendo.com/sg/games/switch/aaaca/index.html"),
            Some("aaaca".to_string())
        );
        assert_eq!(extract_first(&TITLE_CODE, "https://www.nintendo.com/sg/games/other"), None);
    }

    #[test]
    fn test_outline_genre_scrape() {
        let html = r#"<dl class="detail-foot-outline-desc--flex mt10">
            <dt>Genre</dt>
            <dd><p class="detail-foot-outline-txt"><span>Action,</span> <span>Adventure</span></p></dd>
        </dl>"#;
        let block = extract_first(&OUTLINE_GENRES, html).unwrap();
        let genres: Vec<String> = SPAN_TEXT
            .captures_iter(&block)
            .map(|c| c[1].replace(',', "").trim().to_string())
            .collect();
        assert_eq!(genres, vec!["Action", "Adventure"]);
    }
}
