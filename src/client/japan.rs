//! Japan storefront client
//!
//! Queries the search.nintendo.jp software index, filtered to Switch
//! downloadable titles, and scrapes the store page's long-description node.
//! Queries are expected in native script; the normalizer passes Japanese
//! titles through verbatim. Genres arrive in Japanese and are translated
//! through the fixed vocabulary table.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;

use super::{
    ClientError, STORE_LINK_NAME, collapse_whitespace, extract_first, fetch_html, http_client,
    rank_by_distance,
};
use crate::game::{Game, Link};
use crate::genres::translate_genre;

static LONG_DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<div class="productDetail--catchphrase__longDescription[^"]*"[^>]*>(.*?)</div>"#,
    )
    .unwrap()
});

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Option<ResultBody>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ResultBody {
    #[serde(default)]
    total: i64,
    #[serde(default)]
    items: Vec<JapanItem>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
}

/// Raw software item from the Japan index.
#[derive(Debug, Deserialize)]
struct JapanItem {
    title: String,
    #[serde(default)]
    nsuid: Option<String>,
    #[serde(default)]
    genre: Vec<String>,
    #[serde(default)]
    maker: Option<String>,
    /// Retail sale date, `YYYY.M.D`.
    #[serde(default)]
    sdate: Option<String>,
    /// Download sale date, same format.
    #[serde(default)]
    dsdate: Option<String>,
    /// CDN asset identifier for the package image.
    #[serde(default)]
    iurl: Option<String>,
}

fn parse_japan_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y.%m.%d").ok()
}

fn parse_japan_game(item: JapanItem) -> Game {
    let mut game = Game {
        nsuid: item.nsuid.clone(),
        title: Game::clean_title(&item.title),
        release_date: item
            .sdate
            .as_deref()
            .or(item.dsdate.as_deref())
            .and_then(parse_japan_date),
        genres: item.genre.iter().map(|g| translate_genre(g)).collect(),
        cover_image: item
            .iurl
            .map(|i| format!("https://img-eshop.cdn.nintendo.net/i/{}.jpg", i)),
        ..Default::default()
    };

    if let Some(maker) = item.maker.filter(|m| !m.is_empty()) {
        game.publishers.push(maker);
    }
    if let Some(nsuid) = item.nsuid {
        game.links.push(Link::new(
            STORE_LINK_NAME,
            format!("https://store-jp.nintendo.com/list/software/{}.html", nsuid),
        ));
    }

    game.refresh_summary();
    game
}

pub struct JapanClient {
    client: reqwest::Client,
}

impl JapanClient {
    const SEARCH_URL: &'static str = "https://search.nintendo.jp/nintendo_soft/search.json";
    const HARDWARE_FACET: &'static str =
        "hard_s:1_HAC AND (sform_s:HAC_DL OR sform_s:HAC_DOWNLOADABLE)";

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
                tracing::warn!("Japan search failed for {:?}: {:#}", normalized_query, e);
                Vec::new()
            }
        }
    }

    async fn try_search(&self, normalized_query: &str) -> Result<Vec<Game>> {
        tracing::debug!("Searching Japan store index for {:?}", normalized_query);

        let response = self
            .client
            .get(Self::SEARCH_URL)
            .query(&[
                ("q", normalized_query),
                ("limit", "24"),
                ("page", "1"),
                ("sort", "hards asc,score,titlek asc"),
                ("fq", Self::HARDWARE_FACET),
                ("spt", "B"),
            ])
            .send()
            .await
            .context("Failed to query Japan store index")?;

        let data: SearchResponse = response
            .json()
            .await
            .context("Failed to parse Japan search response")?;

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

        tracing::debug!("{} hits for {:?}", body.total, normalized_query);

        Ok(body.items.into_iter().map(parse_japan_game).collect())
    }

    pub async fn get_game_details(&self, game: Game) -> Game {
        let Some(link) = game.store_link(STORE_LINK_NAME).cloned() else {
            return game;
        };

        let mut game = game;
        match fetch_html(&self.client, &link.url).await {
            Ok(html) => {
                if let Some(description) = extract_first(&LONG_DESCRIPTION, &html) {
                    game.full_description = collapse_whitespace(&description);
                } else {
                    tracing::debug!("No long description node on {}", link.url);
                }
            }
            Err(e) => tracing::warn!("Japan detail scrape failed for {}: {:#}", link.url, e),
        }
        game
    }
}

impl Default for JapanClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_item() -> JapanItem {
        serde_json::from_value(json!({
            "title": "スーパーマリオ オデッセイ",
            "nsuid": "70010000000126",
            "icode": "AAACA",
            "genre": ["アクション"],
            "maker": "任天堂",
            "sdate": "2017.10.27",
            "iurl": "HACG_AAACA"
        }))
        .unwrap()
    }

    #[test]
    fn test_parse_full_item() {
        let game = parse_japan_game(sample_item());
        assert_eq!(game.title, "スーパーマリオ オデッセイ");
        assert_eq!(game.nsuid.as_deref(), Some("70010000000126"));
        assert_eq!(game.genres, vec!["Action"]);
        assert_eq!(game.publishers, vec!["任天堂"]);
        assert_eq!(
            game.release_date,
            NaiveDate::from_ymd_opt(2017, 10, 27)
        );
        assert_eq!(
            game.links[0].url,
            "https://store-jp.nintendo.com/list/software/70010000000126.html"
        );
        assert_eq!(
            game.cover_image.as_deref(),
            Some("https://img-eshop.cdn.nintendo.net/i/HACG_AAACA.jpg")
        );
    }

    #[test]
    fn test_unknown_genre_passes_through() {
        let item: JapanItem = serde_json::from_value(json!({
            "title": "テスト",
            "genre": ["メトロイドヴァニア"]
        }))
        .unwrap();
        let game = parse_japan_game(item);
        assert_eq!(game.genres, vec!["メトロイドヴァニア"]);
    }

    #[test]
    fn test_parse_sparse_item_defaults_collections() {
        let item: JapanItem = serde_json::from_value(json!({"title": "テスト"})).unwrap();
        let game = parse_japan_game(item);
        assert!(game.publishers.is_empty());
        assert!(game.genres.is_empty());
        assert!(game.links.is_empty());
        assert!(game.release_date.is_none());
    }

    #[test]
    fn test_japan_date_format() {
        assert_eq!(parse_japan_date("2017.10.27"), NaiveDate::from_ymd_opt(2017, 10, 27));
        assert_eq!(parse_japan_date("2024.3.8"), NaiveDate::from_ymd_opt(2024, 3, 8));
        assert_eq!(parse_japan_date("unreleased"), None);
    }

    #[test]
    fn test_description_node_scrape() {
        let html = r#"<div class="productDetail--catchphrase__longDescription ellipsis">
            帽子の相棒と世界を大冒険。
        </div>"#;
        let description = extract_first(&LONG_DESCRIPTION, html).unwrap();
        assert_eq!(collapse_whitespace(&description), "帽子の相棒と世界を大冒険。");
    }
}
