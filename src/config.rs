/**
 * RecoLab
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use std::fmt;
use std::fs;
use std::path::Path;

use serde_derive::{Deserialize, Serialize};

use crate::error::{RecoError, Result};
use crate::similarity::Similarity;

/// The recommender variants we know how to fit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "POPULAR")]
    Popular,
    #[serde(rename = "UBCF")]
    UserBased,
    #[serde(rename = "IBCF")]
    ItemBased,
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Method::Popular => "POPULAR",
            Method::UserBased => "UBCF",
            Method::ItemBased => "IBCF",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    None,
    Center,
}

/// Closed interval of admissible rating values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub min: f64,
    pub max: f64,
}

impl Scale {
    pub fn new(min: f64, max: f64) -> Self {
        Scale { min, max }
    }

    /// Scale without bounds, used for mean-centered ratings.
    pub fn unbounded() -> Self {
        Scale { min: std::f64::NEG_INFINITY, max: std::f64::INFINITY }
    }

    pub fn contains(&self, value: f64) -> bool {
        !value.is_nan() && value >= self.min && value <= self.max
    }

    pub fn validate(&self) -> Result<()> {
        if self.min.is_nan() || self.max.is_nan() || self.min > self.max {
            return Err(RecoError::config(format!(
                "rating scale [{}, {}] is empty", self.min, self.max)));
        }
        Ok(())
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale { min: 1.0, max: 5.0 }
    }
}

/// Parameters of a single recommender. `k` is ignored by the popularity baseline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    pub method: Method,
    pub normalize: Normalization,
    pub similarity_method: Similarity,
    #[serde(alias = "nn")]
    pub k: usize,
}

impl RecommenderConfig {

    pub fn popular() -> Self {
        RecommenderConfig { method: Method::Popular, ..Default::default() }
    }

    pub fn user_based(k: usize) -> Self {
        RecommenderConfig { method: Method::UserBased, k, ..Default::default() }
    }

    pub fn item_based(k: usize) -> Self {
        RecommenderConfig { method: Method::ItemBased, k, ..Default::default() }
    }

    pub fn with_similarity(self, similarity_method: Similarity) -> Self {
        RecommenderConfig { similarity_method, ..self }
    }

    pub fn with_normalization(self, normalize: Normalization) -> Self {
        RecommenderConfig { normalize, ..self }
    }

    pub fn validate(&self) -> Result<()> {
        if self.method != Method::Popular && self.k == 0 {
            return Err(RecoError::config(format!(
                "{} needs a positive neighborhood size k", self.method)));
        }
        Ok(())
    }
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        RecommenderConfig {
            method: Method::UserBased,
            normalize: Normalization::Center,
            similarity_method: Similarity::Pearson,
            k: 25,
        }
    }
}

/// How ratings are partitioned for offline evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationScheme {
    /// Fraction of users assigned to the training partition, in (0, 1).
    pub train_proportion: f64,
    /// Number of ratings revealed per test user.
    pub given: usize,
    /// Number of independent splits.
    pub folds: usize,
    pub seed: u64,
}

impl EvaluationScheme {
    pub fn validate(&self) -> Result<()> {
        if !(self.train_proportion > 0.0 && self.train_proportion < 1.0) {
            return Err(RecoError::config(format!(
                "train_proportion must lie in (0, 1), found {}", self.train_proportion)));
        }
        if self.given == 0 {
            return Err(RecoError::config("given must be a positive number of ratings"));
        }
        if self.folds == 0 {
            return Err(RecoError::config("folds must be a positive number"));
        }
        Ok(())
    }
}

impl Default for EvaluationScheme {
    fn default() -> Self {
        EvaluationScheme { train_proportion: 0.9, given: 2, folds: 1, seed: 42 }
    }
}

/// Everything needed for an evaluation run, usually read from a JSON file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scale: Scale,
    /// Reject conflicting duplicate ratings instead of keeping the last one.
    pub strict: bool,
    pub scheme: EvaluationScheme,
    pub methods: Vec<RecommenderConfig>,
}

impl Config {

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Config::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.scale.validate()?;
        self.scheme.validate()?;
        if self.methods.is_empty() {
            return Err(RecoError::config("no recommender methods configured"));
        }
        for method in &self.methods {
            method.validate()?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scale: Scale::default(),
            strict: true,
            scheme: EvaluationScheme::default(),
            methods: vec![
                RecommenderConfig::popular(),
                RecommenderConfig::user_based(25),
                RecommenderConfig::item_based(25),
            ],
        }
    }
}
