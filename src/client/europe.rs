//! Europe storefront client
//!
//! Queries the nintendo-europe faceted search index, filtered to the target
//! hardware family, and scrapes the store page's Overview section for the
//! long description.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

use super::{
    ClientError, STORE_LINK_NAME, collapse_whitespace, extract_first, fetch_html, http_client,
    parse_iso_date, rank_by_distance, strip_class_attributes,
};
use crate::game::{Game, Link};
use crate::matching::query_words;
use crate::settings::NintendoPlatform;

static OVERVIEW_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<section[^>]*id="Overview"[^>]*>(.*?)</section>"#).unwrap());

#[derive(Debug, Deserialize)]
struct SelectResponse {
    response: Option<ResponseBody>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(rename = "numFound", default)]
    num_found: i64,
    #[serde(default)]
    docs: Vec<EuropeDoc>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
}

/// Raw search document from the Europe index.
#[derive(Debug, Deserialize)]
struct EuropeDoc {
    title: String,
    #[serde(default)]
    nsuid_txt: Vec<String>,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default)]
    date_from: Option<String>,
    #[serde(default)]
    developer: Option<String>,
    #[serde(default)]
    publisher: Option<String>,
    #[serde(default)]
    pretty_game_categories_txt: Vec<String>,
    #[serde(default)]
    game_series_txt: Vec<String>,
    #[serde(default)]
    age_rating_type: Option<String>,
    #[serde(default)]
    age_rating_value: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    image_url_h2x1_s: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// The index serves protocol-relative CDN paths.
fn absolute_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        url.to_string()
    }
}

fn parse_europe_game(doc: EuropeDoc) -> Game {
    let mut game = Game {
        nsuid: doc.nsuid_txt.into_iter().next(),
        title: Game::clean_title(&doc.title),
        full_description: doc.excerpt.unwrap_or_default(),
        release_date: doc.date_from.as_deref().and_then(parse_iso_date),
        genres: doc.pretty_game_categories_txt,
        series: doc.game_series_txt,
        cover_image: doc.image_url.as_deref().map(absolute_url),
        landscape_image: doc.image_url_h2x1_s.as_deref().map(absolute_url),
        ..Default::default()
    };

    if let Some(dev) = doc.developer.filter(|d| !d.is_empty()) {
        game.developers.push(dev);
    }
    if let Some(publisher) = doc.publisher.filter(|p| !p.is_empty()) {
        game.publishers.push(publisher);
    }
    if let (Some(board), Some(value)) = (doc.age_rating_type, doc.age_rating_value) {
        if !board.is_empty() && !value.is_empty() {
            game.age_ratings.push(format!("{} {}", board, value));
        }
    }
    if let Some(url) = doc.url {
        game.links.push(Link::new(
            STORE_LINK_NAME,
            format!("https://www.nintendo.co.uk{}", url),
        ));
    }

    game.refresh_summary();
    game
}

/// Keep only hits that contain every query token as a whole word, then order
/// by ascending edit distance to the query.
fn order_by_relevance(games: Vec<Game>, normalized_query: &str) -> Vec<Game> {
    let word_patterns: Vec<Regex> = query_words(normalized_query)
        .iter()
        .filter_map(|w| Regex::new(&format!(r"\b{}\b", regex::escape(w))).ok())
        .collect();

    let mut relevant: Vec<Game> = games
        .into_iter()
        .filter(|g| {
            let name = g.name.to_lowercase();
            word_patterns.iter().all(|p| p.is_match(&name))
        })
        .collect();

    rank_by_distance(&mut relevant, normalized_query);
    relevant
}

pub struct EuropeClient {
    client: reqwest::Client,
    platform: NintendoPlatform,
}

impl EuropeClient {
    const SEARCH_URL: &'static str = "https://search.nintendo-europe.com/en/select";

    pub fn new(platform: NintendoPlatform) -> Self {
        Self {
            client: http_client(),
            platform,
        }
    }

    pub async fn search_games(&self, normalized_query: &str) -> Vec<Game> {
        match self.try_search(normalized_query).await {
            Ok(games) => order_by_relevance(games, normalized_query),
            Err(e) => {
                tracing::warn!("Europe search failed for {:?}: {:#}", normalized_query, e);
                Vec::new()
            }
        }
    }

    async fn try_search(&self, normalized_query: &str) -> Result<Vec<Game>> {
        let facet = format!(
            r#"type:GAME AND playable_on_txt:"{}""#,
            self.platform.playable_on_code()
        );

        tracing::debug!("Searching Europe store index for {:?}", normalized_query);

        let response = self
            .client
            .get(Self::SEARCH_URL)
            .query(&[
                ("q", normalized_query),
                ("fq", &facet),
                ("sort", "score desc, date_from desc"),
                ("start", "0"),
                ("rows", "24"),
                ("wt", "json"),
            ])
            .send()
            .await
            .context("Failed to query Europe store index")?;

        let data: SelectResponse = response
            .json()
            .await
            .context("Failed to parse Europe search response")?;

        let Some(body) = data.response else {
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

        tracing::debug!("{} hits for {:?}", body.num_found, normalized_query);

        Ok(body.docs.into_iter().map(parse_europe_game).collect())
    }

    pub async fn get_game_details(&self, game: Game) -> Game {
        let Some(link) = game.store_link(STORE_LINK_NAME).cloned() else {
            return game;
        };

        let mut game = game;
        match fetch_html(&self.client, &link.url).await {
            Ok(html) => {
                if let Some(section) = extract_first(&OVERVIEW_SECTION, &html) {
                    game.full_description = collapse_whitespace(&strip_class_attributes(&section));
                } else {
                    tracing::debug!("No Overview section on {}", link.url);
                }
            }
            Err(e) => tracing::warn!("Europe detail scrape failed for {}: {:#}", link.url, e),
        }
        game
    }
}
