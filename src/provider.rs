//! Metadata resolution orchestrator
//!
//! Drives one metadata request end to end: normalize the game name, search
//! the active region, pick a candidate (interactively or automatically),
//! enrich it with details, then expose only the fields the resolved game
//! actually carries. A request always completes with *some* game; failures
//! degrade to an empty one.

use crate::client::RegionClient;
use crate::game::{Game, Link};
use crate::matching::{contains_all_words, normalize_game_name};
use crate::settings::{AgeRatingOrg, NintendoPlatform, PluginSettings, StoreRegion};

/// Metadata fields this provider can supply to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    Name,
    Description,
    ReleaseDate,
    Developers,
    Publishers,
    Genres,
    Series,
    AgeRating,
    Links,
    CoverImage,
    BackgroundImage,
}

/// Host-supplied request context for one game.
#[derive(Debug, Clone, Default)]
pub struct MetadataRequestOptions {
    /// Library name of the game, as entered by the user or importer.
    pub game_name: String,
    /// Declared platform name, used to narrow multi-hardware indexes.
    pub platform: Option<String>,
    /// Declared region name; overrides the configured store region when
    /// `PluginSettings::prefer_game_region` is set and the name parses.
    pub game_region: Option<String>,
    /// Background mode: resolve without human interaction.
    pub background_download: bool,
    /// Rating board the host prefers for the age-rating field.
    pub age_rating_priority: AgeRatingOrg,
}

/// Host-side candidate picker for interactive resolution. `None` means the
/// user cancelled the search.
pub trait GameChooser {
    fn choose(&self, candidates: Vec<Game>) -> Option<Game>;
}

/// Automatic-mode candidate selection.
///
/// Zero hits: no match. One hit: take it. Several hits: the first whose
/// name contains every query token, never a guess among ambiguous results.
fn select_best_match(results: Vec<Game>, normalized_query: &str) -> Option<Game> {
    match results.len() {
        0 => None,
        1 => results.into_iter().next(),
        _ => results
            .into_iter()
            .find(|g| contains_all_words(&g.name, normalized_query)),
    }
}

/// Rating board whose strings a region's storefront reports.
fn region_rating_org(region: StoreRegion) -> Option<AgeRatingOrg> {
    match region {
        StoreRegion::Usa => Some(AgeRatingOrg::Esrb),
        StoreRegion::Europe => Some(AgeRatingOrg::Pegi),
        StoreRegion::Japan | StoreRegion::Asia => None,
    }
}

fn derive_available_fields(
    game: &Game,
    region: StoreRegion,
    rating_priority: AgeRatingOrg,
) -> Vec<MetadataField> {
    let mut fields = Vec::new();

    if !game.title.is_empty() {
        fields.push(MetadataField::Name);
    }
    if !game.full_description.is_empty() {
        fields.push(MetadataField::Description);
    }
    if game.release_date.is_some() {
        fields.push(MetadataField::ReleaseDate);
    }
    if !game.developers.is_empty() {
        fields.push(MetadataField::Developers);
    }
    if !game.publishers.is_empty() {
        fields.push(MetadataField::Publishers);
    }
    if !game.genres.is_empty() {
        fields.push(MetadataField::Genres);
    }
    if !game.series.is_empty() {
        fields.push(MetadataField::Series);
    }
    if !game.links.is_empty() {
        fields.push(MetadataField::Links);
    }
    if game.cover_image.is_some() {
        fields.push(MetadataField::CoverImage);
    }
    if game.background_image().is_some() {
        fields.push(MetadataField::BackgroundImage);
    }
    if !game.age_ratings.is_empty() && region_rating_org(region) == Some(rating_priority) {
        fields.push(MetadataField::AgeRating);
    }

    fields
}

/// Resolve the active region: configuration, optionally overridden by the
/// game's own declared region.
fn active_region(options: &MetadataRequestOptions, settings: &PluginSettings) -> StoreRegion {
    if settings.prefer_game_region {
        if let Some(region) = options
            .game_region
            .as_deref()
            .and_then(|r| r.parse::<StoreRegion>().ok())
        {
            return region;
        }
    }
    settings.store_region
}

/// One metadata request: owns its region client and the resolved game.
pub struct NintendoMetadataProvider {
    options: MetadataRequestOptions,
    region: StoreRegion,
    client: RegionClient,
    game: Option<Game>,
    available_fields: Vec<MetadataField>,
}

impl NintendoMetadataProvider {
    pub fn new(options: MetadataRequestOptions, settings: &PluginSettings) -> Self {
        let region = active_region(&options, settings);
        let platform = options
            .platform
            .as_deref()
            .map(NintendoPlatform::from_platform_name)
            .unwrap_or_default();

        Self {
            options,
            region,
            client: RegionClient::new(region, platform),
            game: None,
            available_fields: Vec::new(),
        }
    }

    pub fn region(&self) -> StoreRegion {
        self.region
    }

    /// Resolve the game once; subsequent calls are no-ops. Pass a chooser
    /// for interactive requests; background requests ignore it.
    pub async fn resolve(&mut self, chooser: Option<&dyn GameChooser>) {
        if self.game.is_some() {
            return;
        }

        let game = match (self.options.background_download, chooser) {
            (false, Some(chooser)) => self.resolve_interactive(chooser).await,
            _ => self.resolve_automatic().await,
        };

        self.available_fields =
            derive_available_fields(&game, self.region, self.options.age_rating_priority);
        self.game = Some(game);
    }

    async fn resolve_interactive(&self, chooser: &dyn GameChooser) -> Game {
        let query = normalize_game_name(&self.options.game_name);
        let candidates = self.client.search_games(&query).await;

        match chooser.choose(candidates) {
            Some(pick) => self.client.get_game_details(pick).await,
            None => {
                tracing::warn!("Search cancelled for {:?}", self.options.game_name);
                Game::default()
            }
        }
    }

    async fn resolve_automatic(&self) -> Game {
        let query = normalize_game_name(&self.options.game_name);
        let results = self.client.search_games(&query).await;

        match select_best_match(results, &query) {
            Some(game) => self.client.get_game_details(game).await,
            None => {
                tracing::debug!("No confident match for {:?}", self.options.game_name);
                Game::default()
            }
        }
    }

    /// Fields the resolved game actually carries; empty before `resolve`.
    pub fn available_fields(&self) -> &[MetadataField] {
        &self.available_fields
    }

    fn has(&self, field: MetadataField) -> bool {
        self.available_fields.contains(&field)
    }

    fn game(&self) -> Option<&Game> {
        self.game.as_ref()
    }

    pub fn name(&self) -> Option<&str> {
        self.has(MetadataField::Name)
            .then(|| self.game().map(|g| g.title.as_str()))
            .flatten()
    }

    pub fn description(&self) -> Option<&str> {
        self.has(MetadataField::Description)
            .then(|| self.game().map(|g| g.full_description.as_str()))
            .flatten()
    }

    pub fn release_date(&self) -> Option<chrono::NaiveDate> {
        self.has(MetadataField::ReleaseDate)
            .then(|| self.game().and_then(|g| g.release_date))
            .flatten()
    }

    pub fn developers(&self) -> &[String] {
        if self.has(MetadataField::Developers) {
            self.game().map(|g| g.developers.as_slice()).unwrap_or(&[])
        } else {
            &[]
        }
    }

    pub fn publishers(&self) -> &[String] {
        if self.has(MetadataField::Publishers) {
            self.game().map(|g| g.publishers.as_slice()).unwrap_or(&[])
        } else {
            &[]
        }
    }

    pub fn genres(&self) -> &[String] {
        if self.has(MetadataField::Genres) {
            self.game().map(|g| g.genres.as_slice()).unwrap_or(&[])
        } else {
            &[]
        }
    }

    pub fn series(&self) -> &[String] {
        if self.has(MetadataField::Series) {
            self.game().map(|g| g.series.as_slice()).unwrap_or(&[])
        } else {
            &[]
        }
    }

    pub fn age_ratings(&self) -> &[String] {
        if self.has(MetadataField::AgeRating) {
            self.game().map(|g| g.age_ratings.as_slice()).unwrap_or(&[])
        } else {
            &[]
        }
    }

    pub fn links(&self) -> &[Link] {
        if self.has(MetadataField::Links) {
            self.game().map(|g| g.links.as_slice()).unwrap_or(&[])
        } else {
            &[]
        }
    }

    pub fn cover_image(&self) -> Option<&str> {
        self.has(MetadataField::CoverImage)
            .then(|| self.game().and_then(|g| g.cover_image.as_deref()))
            .flatten()
    }

    pub fn background_image(&self) -> Option<&str> {
        self.has(MetadataField::BackgroundImage)
            .then(|| self.game().and_then(|g| g.background_image()))
            .flatten()
    }
}
