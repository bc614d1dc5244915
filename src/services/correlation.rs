//! Feature correlation between items.
//!
//! Each item becomes a row of ratings, emotions and one-hot genre/category
//! columns. Rows are compared pairwise with Spearman's rank correlation over
//! the columns both rows have, then rescaled to [-1, 1].

use std::collections::BTreeSet;

use nalgebra::DMatrix;

use crate::models::{ItemSnapshot, MISSING_NUMBER};

/// Scalar columns, in row order
const SCALAR_COLUMNS: [&str; 9] = [
    "sadness",
    "anger",
    "joy",
    "fear",
    "disgust",
    "imdb_rating",
    "critics_score",
    "audience_score",
    "critics_rating",
];

/// Item × feature matrix; `None` marks an absent value
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<f64>>>,
}

fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v != MISSING_NUMBER as f64)
}

impl FeatureMatrix {
    pub fn build(items: &[ItemSnapshot]) -> Self {
        let genres: BTreeSet<&str> = items
            .iter()
            .flat_map(|s| s.genres.iter().map(String::as_str))
            .collect();
        let categories: BTreeSet<&str> = items
            .iter()
            .flat_map(|s| s.categories.iter().map(String::as_str))
            .collect();

        let columns = SCALAR_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(genres.iter().map(|g| format!("genre:{}", g)))
            .chain(categories.iter().map(|c| format!("category:{}", c)))
            .collect();

        let rows = items
            .iter()
            .map(|snapshot| {
                let item = &snapshot.item;
                let scalars = [
                    item.emotions.sadness,
                    item.emotions.anger,
                    item.emotions.joy,
                    item.emotions.fear,
                    item.emotions.disgust,
                    item.ratings.imdb_rating,
                    item.ratings.critics_score,
                    item.ratings.audience_score,
                    item.ratings.critics_rating,
                ];

                let one_hot = |names: &BTreeSet<&str>, owned: &[String]| -> Vec<Option<f64>> {
                    names
                        .iter()
                        .map(|n| Some(if owned.iter().any(|o| o == n) { 1.0 } else { 0.0 }))
                        .collect::<Vec<_>>()
                };

                scalars
                    .into_iter()
                    .map(present)
                    .chain(one_hot(&genres, &snapshot.genres))
                    .chain(one_hot(&categories, &snapshot.categories))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }
}

/// Average ranks (1-based), ties sharing the mean of their positions
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|a, b| values[*a].total_cmp(&values[*b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        let rank = (start + end) as f64 / 2.0 + 1.0;
        for position in &order[start..=end] {
            ranks[*position] = rank;
        }
        start = end + 1;
    }
    ranks
}

fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        cov += (a - mean_x) * (b - mean_y);
        var_x += (a - mean_x).powi(2);
        var_y += (b - mean_y).powi(2);
    }

    let r = cov / (var_x * var_y).sqrt();
    r.is_finite().then_some(r.clamp(-1.0, 1.0))
}

/// Spearman correlation over the positions where both rows are present
///
/// Undefined results (fewer than two shared values, a constant side) are 0.
pub fn spearman(a: &[Option<f64>], b: &[Option<f64>]) -> f64 {
    let (x, y): (Vec<f64>, Vec<f64>) = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip();

    if x.len() < 2 {
        return 0.0;
    }
    pearson(&average_ranks(&x), &average_ranks(&y)).unwrap_or(0.0)
}

/// Pairwise row correlations; the diagonal is 1
pub fn correlation_matrix(features: &FeatureMatrix) -> DMatrix<f64> {
    let n = features.rows.len();
    let mut matrix = DMatrix::identity(n, n);
    for i in 0..n {
        for j in (i + 1)..n {
            let r = spearman(&features.rows[i], &features.rows[j]);
            matrix[(i, j)] = r;
            matrix[(j, i)] = r;
        }
    }
    matrix
}

/// Rescales off-diagonal values linearly onto [-1, 1] and sets the diagonal
/// to 1. When every off-diagonal value is equal they all become 0.
pub fn min_max_scale(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    let n = matrix.nrows();
    let off_diagonal = || {
        (0..n)
            .flat_map(move |i| (0..n).map(move |j| (i, j)))
            .filter(|(i, j)| i != j)
    };

    let (min, max) = off_diagonal().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), ij| {
        (lo.min(matrix[ij]), hi.max(matrix[ij]))
    });

    let mut scaled = DMatrix::identity(n, n);
    for (i, j) in off_diagonal() {
        scaled[(i, j)] = if max > min {
            -1.0 + 2.0 * (matrix[(i, j)] - min) / (max - min)
        } else {
            0.0
        };
    }
    scaled
}

/// Scaled correlation of every item pair
pub fn correlation_similarity(items: &[ItemSnapshot]) -> DMatrix<f64> {
    let features = FeatureMatrix::build(items);
    tracing::info!(
        items = features.rows.len(),
        columns = features.columns.len(),
        "Correlation features built"
    );
    min_max_scale(&correlation_matrix(&features))
}
