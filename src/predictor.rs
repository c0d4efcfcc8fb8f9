/// Ksat regressor.
///
/// Evaluates a gradient-boosted tree ensemble exported to JSON. The artifact
/// is produced outside this crate; we only load, validate and evaluate it.
///
/// Artifact layout:
///
/// ```json
/// {
///   "feature_names": ["Clay", "Silt", "Sand", "Texture Encoded", "OC"],
///   "base_score": 10.0,
///   "trees": [
///     { "nodes": [
///         { "feature": 2, "threshold": 50.0, "yes": 1, "no": 2 },
///         { "leaf": -2.5 },
///         { "leaf": 4.0 }
///     ] }
///   ]
/// }
/// ```
///
/// A split sends `x[feature] < threshold` to `yes`, everything else to `no`.
/// Node 0 is the root. Children always sit after their parent, so a loaded
/// tree cannot loop.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::logging::{self, Component};
use crate::model::{FeatureVector, KsatError, KsatEstimate, FEATURE_COLUMNS};

// ---------------------------------------------------------------------------
// Artifact structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Leaf {
        leaf: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        yes: usize,
        no: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub feature_names: Vec<String>,
    pub base_score: f64,
    pub trees: Vec<RegressionTree>,
}

impl RegressionTree {
    fn validate(&self, tree_idx: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err(format!("tree {} has no nodes", tree_idx));
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf { leaf } => {
                    if !leaf.is_finite() {
                        return Err(format!("tree {} node {}: leaf value is not finite", tree_idx, idx));
                    }
                }
                TreeNode::Split { feature, threshold, yes, no } => {
                    if *feature >= FEATURE_COLUMNS.len() {
                        return Err(format!(
                            "tree {} node {}: feature index {} out of range",
                            tree_idx, idx, feature
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("tree {} node {}: threshold is not finite", tree_idx, idx));
                    }
                    for child in [*yes, *no] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!(
                                "tree {} node {}: child index {} must point forward within {} nodes",
                                tree_idx,
                                idx,
                                child,
                                self.nodes.len()
                            ));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Walks from the root to a leaf. `None` only for a tree that skipped
    /// validation.
    fn evaluate(&self, x: &[f64; 5]) -> Option<f64> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx)? {
                TreeNode::Leaf { leaf } => return Some(*leaf),
                TreeNode::Split { feature, threshold, yes, no } => {
                    let value = *x.get(*feature)?;
                    let next = if value < *threshold { *yes } else { *no };
                    if next <= idx {
                        return None;
                    }
                    idx = next;
                }
            }
        }
    }
}

impl ModelArtifact {
    fn validate(&self) -> Result<(), String> {
        if self.feature_names != FEATURE_COLUMNS {
            return Err(format!(
                "feature_names {:?} do not match expected column order {:?}",
                self.feature_names, FEATURE_COLUMNS
            ));
        }
        if !self.base_score.is_finite() {
            return Err("base_score is not finite".to_string());
        }
        if self.trees.is_empty() {
            return Err("model contains no trees".to_string());
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate(idx)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Predictor
// ---------------------------------------------------------------------------

/// A loaded, validated model. Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct KsatPredictor {
    artifact: ModelArtifact,
    origin: Option<PathBuf>,
}

impl KsatPredictor {
    /// Reads and validates the artifact at `path`.
    pub fn load(path: &Path) -> Result<Self, KsatError> {
        let json = fs::read_to_string(path).map_err(|e| {
            KsatError::ModelUnavailable(format!("cannot read {}: {}", path.display(), e))
        })?;

        let mut predictor = Self::from_json(&json).map_err(|e| match e {
            KsatError::ModelUnavailable(msg) => {
                KsatError::ModelUnavailable(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        predictor.origin = Some(path.to_path_buf());

        logging::info(
            Component::Model,
            None,
            &format!(
                "Loaded Ksat model from {} ({} trees)",
                path.display(),
                predictor.tree_count()
            ),
        );

        Ok(predictor)
    }

    pub fn from_json(json: &str) -> Result<Self, KsatError> {
        let artifact: ModelArtifact = serde_json::from_str(json)
            .map_err(|e| KsatError::ModelUnavailable(format!("invalid model artifact: {}", e)))?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, KsatError> {
        artifact.validate().map_err(KsatError::ModelUnavailable)?;
        Ok(Self { artifact, origin: None })
    }

    pub fn tree_count(&self) -> usize {
        self.artifact.trees.len()
    }

    /// Where the model was loaded from, if it came from a file.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    /// Raw ensemble output: base score plus one leaf per tree.
    pub fn predict_raw(&self, features: &FeatureVector) -> Result<f64, KsatError> {
        let x = features.as_array();
        if let Some(pos) = x.iter().position(|v| !v.is_finite()) {
            return Err(KsatError::Prediction(format!(
                "feature '{}' is not a finite number ({})",
                FEATURE_COLUMNS[pos], x[pos]
            )));
        }

        let mut total = self.artifact.base_score;
        for (idx, tree) in self.artifact.trees.iter().enumerate() {
            total += tree.evaluate(&x).ok_or_else(|| {
                KsatError::Prediction(format!("tree {} could not be evaluated", idx))
            })?;
        }
        Ok(total)
    }

    /// Predicts Ksat. Ksat cannot be negative, so a negative ensemble output
    /// is floored at 0 and logged.
    pub fn predict(&self, features: &FeatureVector) -> Result<KsatEstimate, KsatError> {
        let raw = self.predict_raw(features)?;
        if raw < 0.0 {
            logging::warn(
                Component::Model,
                None,
                &format!("Model produced negative Ksat {:.4}; using 0", raw),
            );
            return KsatEstimate::new(0.0);
        }
        KsatEstimate::new(raw)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
