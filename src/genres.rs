//! Japanese genre vocabulary translation
//!
//! The Japan storefront reports genres in Japanese. A fixed table maps the
//! common terms to English; unmapped terms pass through untranslated. The
//! table is intentionally not exhaustive.

use std::collections::HashMap;
use std::sync::LazyLock;

static JAPANESE_GENRES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("アクション", "Action"),
        ("アドベンチャー", "Adventure"),
        ("アーケード", "Arcade"),
        ("格闘", "Fighting"),
        ("シューティング", "Shooter"),
        ("ロールプレイング", "Role-Playing"),
        ("シミュレーション", "Simulation"),
        ("ストラテジー", "Strategy"),
        ("スポーツ", "Sports"),
        ("レース", "Racing"),
        ("パズル", "Puzzle"),
        ("音楽", "Music"),
        ("リズム", "Rhythm"),
        ("テーブル", "Tabletop"),
        ("ボード", "Board Game"),
        ("パーティー", "Party"),
        ("クイズ", "Quiz"),
        ("学習", "Education"),
        ("トレーニング", "Training"),
        ("実用", "Utility"),
        ("コミュニケーション", "Communication"),
        ("ホラー", "Horror"),
    ])
});

/// Translate a Japanese genre term to English, passing unknown terms through
/// unchanged.
pub fn translate_genre(genre: &str) -> String {
    JAPANESE_GENRES
        .get(genre.trim())
        .map(|s| (*s).to_string())
        .unwrap_or_else(|| genre.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_genres_translate() {
        assert_eq!(translate_genre("アクション"), "Action");
        assert_eq!(translate_genre("ロールプレイング"), "Role-Playing");
        assert_eq!(translate_genre("パズル"), "Puzzle");
    }

    #[test]
    fn test_unknown_genres_pass_through() {
        assert_eq!(translate_genre("メトロイドヴァニア"), "メトロイドヴァニア");
        assert_eq!(translate_genre("Action"), "Action");
    }

    #[test]
    fn test_translation_trims_whitespace() {
        assert_eq!(translate_genre(" スポーツ "), "Sports");
    }
}
