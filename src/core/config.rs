// src/core/config.rs

use crate::core::common::KnnError;
use crate::core::indexing::{RectangleParams, DEFAULT_LEAF_SIZE};
use crate::core::model::TreeType;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use std::fs;
use std::path::Path;

/// Settings for building a neighbor search model.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// tree_type = "cover"
/// single_mode = true
/// ```
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    #[serde_as(as = "DisplayFromStr")]
    pub tree_type: TreeType,
    /// Leaf size for kd-trees and ball trees.
    pub leaf_size: usize,
    pub naive: bool,
    pub single_mode: bool,
    pub random_basis: bool,
    /// Seed for the random basis; drawn from system entropy when unset.
    pub seed: Option<u64>,
    /// Overlap radius for spill tree searches.
    pub tau: f64,
    /// Relative error allowed by approximate searches; 0 searches exactly.
    pub epsilon: f64,
    pub rectangle: RectangleParams,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            tree_type: TreeType::KdTree,
            leaf_size: DEFAULT_LEAF_SIZE,
            naive: false,
            single_mode: false,
            random_basis: false,
            seed: None,
            tau: 0.0,
            epsilon: 0.0,
            rectangle: RectangleParams::default(),
        }
    }
}

/// Fluent builder for `SearchConfig`; unset fields take their defaults.
#[derive(Debug, Clone, Default)]
pub struct SearchConfigBuilder {
    tree_type: Option<TreeType>,
    leaf_size: Option<usize>,
    naive: Option<bool>,
    single_mode: Option<bool>,
    random_basis: Option<bool>,
    seed: Option<u64>,
    tau: Option<f64>,
    epsilon: Option<f64>,
    rectangle: Option<RectangleParams>,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree_type(mut self, tree_type: TreeType) -> Self {
        self.tree_type = Some(tree_type);
        self
    }

    pub fn leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = Some(leaf_size);
        self
    }

    pub fn naive(mut self, naive: bool) -> Self {
        self.naive = Some(naive);
        self
    }

    pub fn single_mode(mut self, single_mode: bool) -> Self {
        self.single_mode = Some(single_mode);
        self
    }

    pub fn random_basis(mut self, enabled: bool) -> Self {
        self.random_basis = Some(enabled);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn tau(mut self, tau: f64) -> Self {
        self.tau = Some(tau);
        self
    }

    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    pub fn rectangle(mut self, rectangle: RectangleParams) -> Self {
        self.rectangle = Some(rectangle);
        self
    }

    /// Builds the configuration and validates it.
    pub fn build(self) -> Result<SearchConfig, KnnError> {
        let defaults = SearchConfig::default();
        let config = SearchConfig {
            tree_type: self.tree_type.unwrap_or(defaults.tree_type),
            leaf_size: self.leaf_size.unwrap_or(defaults.leaf_size),
            naive: self.naive.unwrap_or(defaults.naive),
            single_mode: self.single_mode.unwrap_or(defaults.single_mode),
            random_basis: self.random_basis.unwrap_or(defaults.random_basis),
            seed: self.seed.or(defaults.seed),
            tau: self.tau.unwrap_or(defaults.tau),
            epsilon: self.epsilon.unwrap_or(defaults.epsilon),
            rectangle: self.rectangle.unwrap_or(defaults.rectangle),
        };
        config.validate()?;
        Ok(config)
    }
}

impl SearchConfig {
    pub fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<(), KnnError> {
        if self.leaf_size == 0 {
            return Err(KnnError::Configuration("leaf_size must be greater than 0".to_string()));
        }
        if !self.tau.is_finite() || self.tau < 0.0 {
            return Err(KnnError::Configuration(format!("tau must be finite and non-negative, got {}", self.tau)));
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(KnnError::Configuration(format!("epsilon must be finite and non-negative, got {}", self.epsilon)));
        }
        self.rectangle
            .validate()
            .map_err(|e| KnnError::Configuration(format!("invalid rectangle tree parameters: {}", e)))
    }

    /// Loads configuration from a TOML file. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `KnnError::Configuration` if the file cannot be parsed or fails
    /// validation, and `KnnError::Io` for any other read failure.
    pub fn load_from_file(path: &Path) -> Result<Self, KnnError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config: Self = toml::from_str(&contents).map_err(|e| {
                    KnnError::Configuration(format!("Failed to parse config file '{}': {}", path.display(), e))
                })?;
                config.validate()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(KnnError::Io(e)),
        }
    }

    pub fn load_or_default(optional_path: Option<&Path>) -> Result<Self, KnnError> {
        match optional_path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), KnnError> {
        let contents = toml::to_string(self)
            .map_err(|e| KnnError::Configuration(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_default_config() {
        let config = SearchConfig::default();
        assert_eq!(config.tree_type, TreeType::KdTree);
        assert_eq!(config.leaf_size, 20);
        assert!(!config.naive);
        assert!(!config.single_mode);
        assert!(!config.random_basis);
        assert_eq!(config.seed, None);
        assert_eq!(config.tau, 0.0);
        assert_eq!(config.epsilon, 0.0);
        assert_eq!(config.rectangle, RectangleParams::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = SearchConfig::builder()
            .tree_type(TreeType::XTree)
            .leaf_size(5)
            .single_mode(true)
            .random_basis(true)
            .seed(9)
            .tau(0.25)
            .epsilon(0.1)
            .build()
            .unwrap();
        assert_eq!(config.tree_type, TreeType::XTree);
        assert_eq!(config.leaf_size, 5);
        assert!(config.single_mode);
        assert!(config.random_basis);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.tau, 0.25);
        assert_eq!(config.epsilon, 0.1);
    }

    #[test]
    fn test_config_validation() {
        assert!(SearchConfig::builder().leaf_size(0).build().is_err());
        assert!(SearchConfig::builder().tau(-0.5).build().is_err());
        assert!(SearchConfig::builder().tau(f64::INFINITY).build().is_err());
        assert!(SearchConfig::builder().epsilon(-0.1).build().is_err());
        assert!(SearchConfig::builder().epsilon(f64::NAN).build().is_err());
        let bad_rect = RectangleParams { max_leaf_size: 4, min_leaf_size: 4, ..RectangleParams::default() };
        assert!(matches!(SearchConfig::builder().rectangle(bad_rect).build(), Err(KnnError::Configuration(_))));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "tree_type = \"r-star\"").unwrap();
        writeln!(file, "single_mode = true").unwrap();
        writeln!(file, "[rectangle]").unwrap();
        writeln!(file, "max_leaf_size = 10").unwrap();
        writeln!(file, "min_leaf_size = 4").unwrap();

        let config = SearchConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.tree_type, TreeType::RStarTree);
        assert!(config.single_mode);
        assert_eq!(config.leaf_size, 20);
        assert_eq!(config.rectangle.max_leaf_size, 10);
        assert_eq!(config.rectangle.max_num_children, 5);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = SearchConfig::load_from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, SearchConfig::default());
        assert_eq!(SearchConfig::load_or_default(None).unwrap(), SearchConfig::default());
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "tree_type = \"quadtree\"").unwrap();
        assert!(matches!(SearchConfig::load_from_file(file.path()), Err(KnnError::Configuration(_))));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "leaf_size = 0").unwrap();
        assert!(matches!(SearchConfig::load_from_file(file.path()), Err(KnnError::Configuration(_))));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("search.toml");
        let config = SearchConfig::builder().tree_type(TreeType::CoverTree).naive(true).seed(3).build().unwrap();
        config.save_to_file(&path).unwrap();
        assert_eq!(SearchConfig::load_or_default(Some(&path)).unwrap(), config);
    }
}
