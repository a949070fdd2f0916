use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::item::Location;
use crate::parser::{SentenceParser, Vocabulary};
use crate::ConfigError;

/// Capture sites and parser vocabulary loaded from `catalog.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureCatalog {
    /// The fixed set of sites a capture can be filed under.
    pub sites: Vec<String>,
    /// Units recognized in addition to the built-in gram units.
    #[serde(default)]
    pub units: Vec<String>,
    /// Brands added to the built-in lexicon.
    #[serde(default)]
    pub brands: Vec<String>,
    /// Sentences the scripted recognizer replays.
    #[serde(default)]
    pub samples: Vec<String>,
}

impl CaptureCatalog {
    /// Built-in vocabulary extended with the catalog's units and brands.
    #[must_use]
    pub fn vocabulary(&self) -> Vocabulary {
        let mut vocabulary = Vocabulary::default();
        vocabulary.extend_units(&self.units);
        vocabulary.extend_brands(&self.brands);
        vocabulary
    }

    #[must_use]
    pub fn parser(&self) -> SentenceParser {
        SentenceParser::new(self.vocabulary())
    }

    /// Resolves `name` against the configured sites.
    ///
    /// Returns `None` when the name is not one of the sites.
    #[must_use]
    pub fn site(&self, name: &str) -> Option<Location> {
        let name = name.trim();
        self.sites
            .iter()
            .find(|site| site.as_str() == name)
            .and_then(|site| Location::new(site.as_str()).ok())
    }
}

/// Load and validate the capture catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<CaptureCatalog, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_catalog(&content)
}

/// Parse and validate catalog YAML.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_catalog(content: &str) -> Result<CaptureCatalog, ConfigError> {
    let catalog: CaptureCatalog = serde_yaml::from_str(content)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn validate_catalog(catalog: &CaptureCatalog) -> Result<(), ConfigError> {
    if catalog.sites.is_empty() {
        return Err(ConfigError::Validation(
            "at least one capture site is required".to_string(),
        ));
    }

    let mut seen_sites = HashSet::new();
    for site in &catalog.sites {
        let trimmed = site.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Validation(
                "site name must be non-empty".to_string(),
            ));
        }
        if trimmed != site {
            return Err(ConfigError::Validation(format!(
                "site name '{site}' has surrounding whitespace"
            )));
        }
        if !seen_sites.insert(trimmed) {
            return Err(ConfigError::Validation(format!(
                "duplicate site name: '{site}'"
            )));
        }
    }

    if catalog.units.iter().any(|u| u.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "unit tokens must be non-empty".to_string(),
        ));
    }
    if catalog.brands.iter().any(|b| b.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "brand names must be non-empty".to_string(),
        ));
    }

    let parser = catalog.parser();
    if let Some(sample) = catalog.samples.iter().find(|s| !parser.parse(s).is_match()) {
        return Err(ConfigError::Validation(format!(
            "sample sentence does not parse: '{sample}'"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r"
sites:
  - 青岛办事处
  - 济南办事处
units:
  - ml
brands:
  - 伊利
samples:
  - 喜旺手掰肉老火腿340g — 19.90
  - 伊利纯牛奶250ml — 3.50
";

    #[test]
    fn parses_valid_catalog() {
        let catalog = parse_catalog(VALID).unwrap();
        assert_eq!(catalog.sites.len(), 2);
        assert_eq!(catalog.samples.len(), 2);
    }

    #[test]
    fn vocabulary_extends_defaults() {
        let vocabulary = parse_catalog(VALID).unwrap().vocabulary();
        assert!(vocabulary.units().iter().any(|u| u == "g"));
        assert!(vocabulary.units().iter().any(|u| u == "ml"));
        assert!(vocabulary.brands().iter().any(|b| b == "喜旺"));
        assert!(vocabulary.brands().iter().any(|b| b == "伊利"));
    }

    #[test]
    fn site_lookup_requires_membership() {
        let catalog = parse_catalog(VALID).unwrap();
        assert_eq!(
            catalog.site(" 青岛办事处 ").map(|l| l.as_str().to_owned()),
            Some("青岛办事处".to_owned())
        );
        assert!(catalog.site("上海办事处").is_none());
    }

    #[test]
    fn rejects_empty_site_list() {
        let err = parse_catalog("sites: []").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_duplicate_sites() {
        let err = parse_catalog("sites: [青岛办事处, 青岛办事处]").unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(ref msg) if msg.contains("duplicate")),
            "got {err:?}"
        );
    }

    #[test]
    fn rejects_blank_unit() {
        let err = parse_catalog("sites: [青岛办事处]\nunits: [' ']").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_unparseable_sample() {
        let err = parse_catalog("sites: [青岛办事处]\nsamples: [hello]").unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(ref msg) if msg.contains("hello")),
            "got {err:?}"
        );
    }

    #[test]
    fn rejects_malformed_yaml() {
        let err = parse_catalog("sites: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::CatalogFileParse(_)));
    }

    #[test]
    fn load_catalog_reports_missing_file() {
        let err = load_catalog(Path::new("/nonexistent/catalog.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::CatalogFileIo { .. }));
    }
}
