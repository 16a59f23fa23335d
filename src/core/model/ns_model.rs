// src/core/model/ns_model.rs

use super::engine::SearchEngine;
use super::random_basis::RandomBasis;
use super::tree_type::TreeType;
use crate::core::common::KnnError;
use crate::core::config::SearchConfig;
use crate::core::indexing::{RectangleParams, DEFAULT_LEAF_SIZE};
use crate::core::search::SearchStats;
use crate::core::sort::{FurthestNeighborSort, NearestNeighborSort, SortPolicy};
use crate::core::types::{NeighborResult, PointSet};
use log::info;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Layout version written into every model record.
pub const MODEL_VERSION: u32 = 1;

/// k-nearest-neighbor model.
pub type KnnModel = NsModel<NearestNeighborSort>;
/// k-furthest-neighbor model.
pub type KfnModel = NsModel<FurthestNeighborSort>;

/// Neighbor search model whose tree type is chosen at runtime.
///
/// A fresh model holds no engine; `build_model` creates one for the current
/// tree type (releasing any previous one) and trains it. With a random basis
/// enabled, the reference set is rotated by a freshly drawn orthogonal
/// matrix before indexing and every query set is rotated by the same matrix
/// before searching. Rotations preserve distances, so results are those of
/// the untransformed data.
#[derive(Debug)]
pub struct NsModel<P: SortPolicy> {
    tree_type: TreeType,
    random_basis: bool,
    seed: Option<u64>,
    basis: Option<RandomBasis>,
    leaf_size: usize,
    epsilon: f64,
    rectangle: RectangleParams,
    engine: Option<SearchEngine<P>>,
}

impl<P: SortPolicy> Default for NsModel<P> {
    fn default() -> Self {
        Self::new(TreeType::default(), false)
    }
}

impl<P: SortPolicy> NsModel<P> {
    pub fn new(tree_type: TreeType, random_basis: bool) -> Self {
        Self {
            tree_type,
            random_basis,
            seed: None,
            basis: None,
            leaf_size: DEFAULT_LEAF_SIZE,
            epsilon: 0.0,
            rectangle: RectangleParams::default(),
            engine: None,
        }
    }

    /// Builds and trains a model as described by `config`.
    pub fn from_config(config: &SearchConfig, reference: PointSet) -> Result<Self, KnnError> {
        config.validate()?;
        let mut model = Self::new(config.tree_type, config.random_basis);
        model.seed = config.seed;
        model.epsilon = config.epsilon;
        model.rectangle = config.rectangle.clone();
        model.build_model(reference, config.leaf_size, config.naive, config.single_mode)?;
        Ok(model)
    }

    /// Seeds the random basis draw of later builds.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Relative error allowed by searches on engines built from now on.
    pub fn with_epsilon(mut self, epsilon: f64) -> Result<Self, KnnError> {
        check_epsilon(epsilon)?;
        self.epsilon = epsilon;
        Ok(self)
    }

    /// Node capacities used when the tree type is an R, R* or X tree.
    pub fn with_rectangle_params(mut self, rectangle: RectangleParams) -> Self {
        self.rectangle = rectangle;
        self
    }

    /// Creates the engine for the current tree type and trains it on `reference`.
    ///
    /// `leaf_size` only applies to kd-trees and ball trees. If anything fails,
    /// the previously built engine is left untouched.
    pub fn build_model(
        &mut self,
        reference: PointSet,
        leaf_size: usize,
        naive: bool,
        single_mode: bool,
    ) -> Result<(), KnnError> {
        let mut engine = SearchEngine::new(self.tree_type, leaf_size, &self.rectangle, naive, single_mode)?;
        engine.searcher_mut().set_epsilon(self.epsilon)?;

        let (basis, reference) = if self.random_basis {
            let basis = RandomBasis::new(reference.dim(), self.seed);
            let rotated = basis.apply(&reference)?;
            (Some(basis), rotated)
        } else {
            (None, reference)
        };

        info!(
            "building {} {} model over {} points ({})",
            P::NAME,
            self.tree_type.tree_name(),
            reference.len(),
            mode_label(naive, single_mode)
        );
        engine.searcher_mut().train(reference)?;

        self.engine = Some(engine);
        self.basis = basis;
        self.leaf_size = leaf_size;
        Ok(())
    }

    fn engine(&self) -> Result<&SearchEngine<P>, KnnError> {
        self.engine.as_ref().ok_or_else(|| KnnError::not_initialized("model has not been built"))
    }

    fn engine_mut(&mut self) -> Result<&mut SearchEngine<P>, KnnError> {
        self.engine.as_mut().ok_or_else(|| KnnError::not_initialized("model has not been built"))
    }

    /// Searches `queries`, rotating them first when the model uses a random basis.
    pub fn search(&mut self, queries: &PointSet, k: usize) -> Result<NeighborResult, KnnError> {
        let queries = match &self.basis {
            Some(basis) if !queries.is_empty() => Cow::Owned(basis.apply(queries)?),
            _ => Cow::Borrowed(queries),
        };
        self.engine_mut()?.searcher_mut().search(&queries, k)
    }

    /// Searches the reference set against itself; no point is its own neighbor.
    pub fn search_self(&mut self, k: usize) -> Result<NeighborResult, KnnError> {
        self.engine_mut()?.searcher_mut().search_self(k)
    }

    /// The reference set as indexed (rotated, if a random basis is in use).
    pub fn dataset(&self) -> Result<Cow<'_, PointSet>, KnnError> {
        self.engine()?.searcher().reference_set()
    }

    pub fn naive(&self) -> Result<bool, KnnError> {
        Ok(self.engine()?.searcher().naive())
    }

    pub fn set_naive(&mut self, naive: bool) -> Result<(), KnnError> {
        self.engine_mut()?.searcher_mut().set_naive(naive)
    }

    pub fn single_mode(&self) -> Result<bool, KnnError> {
        Ok(self.engine()?.searcher().single_mode())
    }

    pub fn set_single_mode(&mut self, single_mode: bool) -> Result<(), KnnError> {
        self.engine_mut()?.searcher_mut().set_single_mode(single_mode);
        Ok(())
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Applies to the current engine, if built, and to every later build.
    pub fn set_epsilon(&mut self, epsilon: f64) -> Result<(), KnnError> {
        check_epsilon(epsilon)?;
        if let Some(engine) = &mut self.engine {
            engine.searcher_mut().set_epsilon(epsilon)?;
        }
        self.epsilon = epsilon;
        Ok(())
    }

    pub fn last_search_stats(&self) -> Result<SearchStats, KnnError> {
        Ok(self.engine()?.searcher().last_search_stats())
    }

    pub fn tree_type(&self) -> TreeType {
        self.tree_type
    }

    /// Selects the tree type for the next `build_model`; a built engine is kept until then.
    pub fn set_tree_type(&mut self, tree_type: TreeType) {
        self.tree_type = tree_type;
    }

    pub fn tree_name(&self) -> &'static str {
        self.tree_type.tree_name()
    }

    pub fn random_basis(&self) -> bool {
        self.random_basis
    }

    /// Takes effect on the next `build_model`.
    pub fn set_random_basis(&mut self, random_basis: bool) {
        self.random_basis = random_basis;
    }

    /// The rotation applied by the current engine, if any.
    pub fn basis(&self) -> Option<&PointSet> {
        self.basis.as_ref().map(RandomBasis::matrix)
    }

    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    pub fn is_built(&self) -> bool {
        self.engine.is_some()
    }

    pub fn to_json(&self) -> Result<String, KnnError> {
        Ok(serde_json::to_string(&self.record())?)
    }

    pub fn from_json(json: &str) -> Result<Self, KnnError> {
        Self::from_record(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), KnnError> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &self.record())?;
        info!("saved {} to {}", P::MODEL_NAME, path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, KnnError> {
        let reader = BufReader::new(File::open(path)?);
        let model = Self::from_record(serde_json::from_reader(reader)?)?;
        info!("loaded {} ({}) from {}", P::MODEL_NAME, model.tree_name(), path.display());
        Ok(model)
    }

    fn record(&self) -> ModelRecord<'_, P> {
        ModelRecord {
            name: P::MODEL_NAME,
            version: MODEL_VERSION,
            tree_type: self.tree_type,
            random_basis: self.random_basis,
            basis: self.basis.as_ref(),
            leaf_size: self.leaf_size,
            epsilon: self.epsilon,
            rectangle: &self.rectangle,
            engine: self.engine.as_ref(),
        }
    }

    fn from_record(record: StoredModel<P>) -> Result<Self, KnnError> {
        if record.name != P::MODEL_NAME {
            return Err(KnnError::SerializationTypeMismatch { expected: P::MODEL_NAME.to_string(), found: record.name });
        }
        if record.version != MODEL_VERSION {
            return Err(KnnError::Configuration(format!(
                "unsupported model record version {} (expected {})",
                record.version, MODEL_VERSION
            )));
        }
        if let Some(engine) = &record.engine {
            if engine.tree_type() != record.tree_type {
                return Err(KnnError::SerializationTypeMismatch {
                    expected: record.tree_type.tree_name().to_string(),
                    found: engine.tree_type().tree_name().to_string(),
                });
            }
        }
        match &record.basis {
            Some(basis) if basis.matrix().rows() != basis.matrix().cols() => {
                return Err(KnnError::DimensionMismatch { expected: basis.matrix().rows(), found: basis.matrix().cols() });
            }
            None if record.random_basis && record.engine.is_some() => {
                return Err(KnnError::Configuration("model record uses a random basis but stores none".to_string()));
            }
            _ => {}
        }
        check_epsilon(record.epsilon)?;
        Ok(Self {
            tree_type: record.tree_type,
            random_basis: record.random_basis,
            seed: None,
            basis: record.basis,
            leaf_size: record.leaf_size,
            epsilon: record.epsilon,
            rectangle: record.rectangle,
            engine: record.engine,
        })
    }
}

fn check_epsilon(epsilon: f64) -> Result<(), KnnError> {
    if !epsilon.is_finite() || epsilon < 0.0 {
        return Err(KnnError::invalid(format!("epsilon must be finite and non-negative, got {}", epsilon)));
    }
    Ok(())
}

fn mode_label(naive: bool, single_mode: bool) -> &'static str {
    match (naive, single_mode) {
        (true, _) => "naive",
        (false, true) => "single-tree",
        (false, false) => "dual-tree",
    }
}

/// Persisted form of a model, written from borrowed state.
#[serde_as]
#[derive(Serialize)]
#[serde(bound = "")]
struct ModelRecord<'m, P: SortPolicy> {
    name: &'static str,
    version: u32,
    #[serde_as(as = "DisplayFromStr")]
    tree_type: TreeType,
    random_basis: bool,
    basis: Option<&'m RandomBasis>,
    leaf_size: usize,
    epsilon: f64,
    rectangle: &'m RectangleParams,
    engine: Option<&'m SearchEngine<P>>,
}

/// Persisted form of a model, read back into owned state.
#[serde_as]
#[derive(Deserialize)]
#[serde(bound = "")]
struct StoredModel<P: SortPolicy> {
    name: String,
    version: u32,
    #[serde_as(as = "DisplayFromStr")]
    tree_type: TreeType,
    random_basis: bool,
    basis: Option<RandomBasis>,
    leaf_size: usize,
    #[serde(default)]
    epsilon: f64,
    #[serde(default)]
    rectangle: RectangleParams,
    engine: Option<SearchEngine<P>>,
}
