use std::time::Instant;

use scoped_pool::Pool;
use serde_derive::Serialize;
use tracing::info;

pub mod config;
pub mod error;
pub mod evaluate;
pub mod io;
pub mod neighbors;
pub mod normalize;
pub mod recommender;
pub mod similarity;
pub mod split;
pub mod stats;
pub mod store;
pub mod types;


pub use config::{Config, EvaluationScheme, Method, Normalization, RecommenderConfig, Scale};
pub use error::{DataError, RecoError, Result};
pub use evaluate::AccuracyReport;
pub use recommender::{Prediction, Predictions, RecommenderModel};
pub use similarity::Similarity;
pub use store::{RatingStore, StoreStats};

/// Accuracy of one fitted model on one fold.
#[derive(Clone, Debug, Serialize)]
pub struct FoldReport {
    pub fold: usize,
    pub test_users: usize,
    pub excluded_users: usize,
    pub fit_millis: u64,
    pub accuracy: AccuracyReport,
}

/// Per-fold accuracy of one recommender configuration and the averages over all folds.
#[derive(Clone, Debug, Serialize)]
pub struct MethodReport {
    pub config: RecommenderConfig,
    pub folds: Vec<FoldReport>,
    pub mean_rmse: Option<f64>,
    pub mean_mae: Option<f64>,
    pub mean_coverage: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct EvaluationReport {
    pub stats: StoreStats,
    pub scheme: EvaluationScheme,
    pub methods: Vec<MethodReport>,
}

/// Splits `ratings` according to the configured scheme, then fits every configured method on
/// every fold and measures how well it predicts the held-out ratings of the test users from
/// their revealed ratings. The whole configuration is validated before any work starts.
pub fn evaluate_methods(
    ratings: &RatingStore,
    config: &Config,
    pool: &Pool,
) -> Result<EvaluationReport> {

    config.validate()?;

    let stats = ratings.stats();
    info!(
        "Evaluating {} methods on {} ratings between {} users and {} items.",
        config.methods.len(),
        stats.num_ratings,
        stats.num_users,
        stats.num_items,
    );

    let folds = split::split(ratings, &config.scheme)?;

    let mut methods = Vec::with_capacity(config.methods.len());

    for method_config in &config.methods {

        let mut fold_reports = Vec::with_capacity(folds.len());

        for fold in &folds {
            let fit_start = Instant::now();
            let model = RecommenderModel::fit(method_config, &fold.train, pool)?;
            let fit_millis = fit_start.elapsed().as_millis() as u64;

            let predictions = model.predict_batch(&fold.test_known, &fold.test_unknown, pool);
            let accuracy = evaluate::evaluate_on(pool, &predictions, &fold.test_unknown)?;

            info!(
                "{} on fold {}: rmse {:?}, mae {:?}, coverage {:.3}, {} cold starts",
                method_config.method,
                fold.index,
                accuracy.rmse,
                accuracy.mae,
                accuracy.coverage,
                accuracy.cold_starts,
            );

            fold_reports.push(FoldReport {
                fold: fold.index,
                test_users: fold.test_users().len(),
                excluded_users: fold.excluded.len(),
                fit_millis,
                accuracy,
            });
        }

        methods.push(summarize(*method_config, fold_reports));
    }

    Ok(EvaluationReport { stats, scheme: config.scheme, methods })
}

fn summarize(config: RecommenderConfig, folds: Vec<FoldReport>) -> MethodReport {
    let num_folds = folds.len() as f64;

    let mean_of = |values: Vec<Option<f64>>| -> Option<f64> {
        let defined: Vec<f64> = values.into_iter().flatten().collect();
        if defined.is_empty() {
            None
        } else {
            Some(defined.iter().sum::<f64>() / defined.len() as f64)
        }
    };

    let mean_rmse = mean_of(folds.iter().map(|fold| fold.accuracy.rmse).collect());
    let mean_mae = mean_of(folds.iter().map(|fold| fold.accuracy.mae).collect());
    let mean_coverage = if folds.is_empty() {
        0.0
    } else {
        folds.iter().map(|fold| fold.accuracy.coverage).sum::<f64>() / num_folds
    };

    MethodReport { config, folds, mean_rmse, mean_mae, mean_coverage }
}
