//! Unified game entity produced by the region clients
//!
//! Every storefront response shape is normalized into [`Game`]. List-valued
//! fields are always allocated, never null, so consumers can iterate without
//! checking.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// A named URL attached to a game (store page, landing page).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub url: String,
}

impl Link {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Metadata for a single storefront game.
///
/// Created fresh per search hit, optionally enriched once by
/// `get_game_details`, and discarded at the end of the host's request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Game {
    /// Region-specific store identifier, absent for some regions.
    pub nsuid: Option<String>,
    /// Display name shown in the host's chooser.
    pub name: String,
    /// Non-authoritative chooser summary: `"{year}-{month}-{day} | {publisher}"`.
    pub summary: String,
    /// Game title with trademark symbols stripped.
    pub title: String,
    /// Long-form description, HTML or plain text; may be empty.
    pub full_description: String,
    pub release_date: Option<NaiveDate>,
    pub developers: Vec<String>,
    pub publishers: Vec<String>,
    pub genres: Vec<String>,
    /// Series/franchise names.
    pub series: Vec<String>,
    /// Zero or one rating-board-specific string, e.g. `"ESRB Everyone"`.
    pub age_ratings: Vec<String>,
    pub links: Vec<Link>,
    /// Cover image URL, 1:1 or near-square aspect.
    pub cover_image: Option<String>,
    /// Background image URL, 16:9 aspect.
    pub landscape_image: Option<String>,
}

impl Game {
    /// Strip trademark symbols the storefronts embed in titles.
    pub fn clean_title(raw: &str) -> String {
        raw.replace(['™', '®'], "").trim().to_string()
    }

    /// Background image for the host, falling back to the cover when the
    /// storefront has no 16:9 asset.
    pub fn background_image(&self) -> Option<&str> {
        self.landscape_image
            .as_deref()
            .or(self.cover_image.as_deref())
    }

    /// Store link a detail scrape should follow, by link name.
    pub fn store_link(&self, name: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.name == name)
    }

    /// Recompute the chooser summary from release date and first publisher.
    pub fn refresh_summary(&mut self) {
        let date = self
            .release_date
            .map(|d| format!("{}-{}-{}", d.year(), d.month(), d.day()))
            .unwrap_or_default();
        let publisher = self.publishers.first().cloned().unwrap_or_default();
        self.summary = format!("{} | {}", date, publisher);
        self.name = self.title.clone();
    }
}
