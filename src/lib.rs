//! Nintendo storefront metadata scraping for game library managers
//!
//! Searches a region-specific Nintendo storefront for a game, ranks the
//! candidates, and returns one unified [`game::Game`] with title, description,
//! release date, companies, genres, images and store links. The regional
//! endpoints are unofficial and may change without notice.

pub mod client;
pub mod game;
pub mod genres;
pub mod matching;
pub mod provider;
pub mod settings;
