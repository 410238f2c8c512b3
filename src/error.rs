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

use thiserror::Error;

/// Rejected rating records. These are fatal at the ingestion boundary.
#[derive(Debug, Error, PartialEq)]
pub enum DataError {
    #[error("rating {value} of user {user} for item {item} is outside the scale [{min}, {max}]")]
    OutOfScale { user: u32, item: u32, value: f64, min: f64, max: f64 },

    #[error("user {user} already rated item {item} with {existing}, refusing {value}")]
    Conflict { user: u32, item: u32, existing: f64, value: f64 },

    #[error("malformed record at line {line}: {reason}")]
    Malformed { line: u64, reason: String },
}

#[derive(Debug, Error)]
pub enum RecoError {
    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Every test user of a fold had fewer than `given` ratings, so nothing is left to evaluate.
    #[error("fold {fold} has no test users left ({excluded} excluded for having fewer than \
        {given} ratings)")]
    Split { fold: usize, excluded: usize, given: usize },

    /// The user partition of a fold left no test users at all.
    #[error("fold {fold} has no test users: all {num_users} users were assigned to training")]
    NoTestUsers { fold: usize, num_users: usize },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RecoError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        RecoError::Config(message.into())
    }
}

pub type Result<T> = std::result::Result<T, RecoError>;
