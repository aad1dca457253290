//! Category lists: built-in defaults, a user file, and command-line overrides.

use std::path::Path;

use crate::error::ConfigError;

/// Built-in list of common photo categories.
#[rustfmt::skip]
pub const DEFAULT_CATEGORIES: &[&str] = &[
    // People & social
    "people", "portrait", "selfie", "group photo", "baby", "wedding", "family",
    // Animals
    "dog", "cat", "bird", "wildlife", "pet", "fish", "insect",
    // Nature & landscapes
    "landscape", "mountain", "forest", "ocean", "lake", "river", "waterfall",
    "desert", "field", "garden", "park", "sunrise", "sunset", "sky", "clouds",
    // Urban & architecture
    "city", "building", "skyscraper", "bridge", "street", "house", "church",
    "castle", "monument", "ruins",
    // Food & drink
    "food", "dessert", "coffee", "cocktail", "fruit", "meal",
    // Travel & transport
    "car", "airplane", "boat", "train", "bicycle", "motorcycle", "road",
    "airport", "harbor",
    // Activities & sports
    "sports", "hiking", "swimming", "skiing", "concert", "festival", "party",
    // Art & creative
    "art", "painting", "sculpture", "graffiti", "illustration", "calligraphy",
    // Indoor & objects
    "indoor", "furniture", "electronics", "book", "toy", "instrument",
    "clothing", "jewelry",
    // Documents & screenshots
    "document", "screenshot", "whiteboard", "diagram", "chart", "map", "sign",
    "receipt", "menu",
    // Miscellaneous
    "flower", "tree", "night", "fireworks", "snow", "rain", "fog",
    "abstract", "pattern", "texture", "macro", "aerial",
];

pub fn defaults() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect()
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn parse_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect()
}

/// Parse a category file: one per line, `#` lines and blank lines ignored.
pub fn parse_file(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Read a custom category file. A missing file yields `None`.
pub fn load_file(path: &Path) -> Result<Option<Vec<String>>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(parse_file(&text))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::CategoriesFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Pick the categories for a run: command line, then file, then defaults.
pub fn resolve(cli: &[String], file: &Path) -> Result<Vec<String>, ConfigError> {
    if !cli.is_empty() {
        return Ok(cli.to_vec());
    }

    match load_file(file)? {
        Some(custom) if !custom.is_empty() => {
            tracing::debug!("Using {} categories from {:?}", custom.len(), file);
            Ok(custom)
        }
        _ => Ok(defaults()),
    }
}
