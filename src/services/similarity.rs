//! Similarity blending and the similar-edge writer.

use std::collections::BTreeMap;

use nalgebra::DMatrix;

use crate::{
    config::SimilaritySettings,
    db::GraphStore,
    error::{AppError, AppResult},
    models::{ItemId, ItemSnapshot},
    services::{
        cancel::CancellationToken,
        correlation::correlation_similarity,
        text::{document, text_similarity},
    },
};

/// `text_weight · text + correlation_weight · correlation`, element-wise
pub fn blend(
    text: &DMatrix<f64>,
    correlation: &DMatrix<f64>,
    settings: &SimilaritySettings,
) -> AppResult<DMatrix<f64>> {
    if text.shape() != correlation.shape() {
        return Err(AppError::Internal(format!(
            "Similarity matrices disagree: text {:?}, correlation {:?}",
            text.shape(),
            correlation.shape()
        )));
    }
    Ok(text * settings.text_weight + correlation * settings.correlation_weight)
}

/// Best-scoring other items for row `i`
///
/// Ties keep snapshot order. Only the top `max_neighbours` are considered,
/// and of those only scores strictly above `threshold` are kept.
pub fn neighbours(scores: &DMatrix<f64>, i: usize, settings: &SimilaritySettings) -> Vec<(usize, f64)> {
    let mut ranked: Vec<(usize, f64)> = (0..scores.ncols())
        .filter(|j| *j != i)
        .map(|j| (j, scores[(i, j)]))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    ranked
        .into_iter()
        .take(settings.max_neighbours)
        .filter(|(_, score)| *score > settings.threshold)
        .collect()
}

/// Undirected edges from every item's neighbour list
///
/// Keyed by the ordered id pair. When both directions select the same pair
/// the scores are equal, since the blended matrix is symmetric.
pub fn similar_edges(
    items: &[ItemSnapshot],
    scores: &DMatrix<f64>,
    settings: &SimilaritySettings,
) -> BTreeMap<(ItemId, ItemId), f64> {
    let mut edges = BTreeMap::new();
    for (i, snapshot) in items.iter().enumerate() {
        for (j, score) in neighbours(scores, i, settings) {
            let (a, b) = (&snapshot.item.id, &items[j].item.id);
            let key = if a <= b {
                (a.clone(), b.clone())
            } else {
                (b.clone(), a.clone())
            };
            edges.insert(key, score);
        }
    }
    edges
}

/// Summary of one similarity run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityStats {
    pub items: usize,
    pub removed: u64,
    pub written: usize,
}

/// Runs both models over a snapshot and ranks the blended scores into edges
///
/// CPU-bound; call it off the async runtime. Cancellation is checked between
/// stages.
pub fn compute_edges(
    items: &[ItemSnapshot],
    settings: &SimilaritySettings,
    cancel: &CancellationToken,
) -> AppResult<BTreeMap<(ItemId, ItemId), f64>> {
    let documents: Vec<String> = items.iter().map(|s| document(&s.item.text)).collect();
    let text = text_similarity(&documents, settings.lsi_rank);
    cancel.check()?;

    let correlation = correlation_similarity(items);
    cancel.check()?;

    let scores = blend(&text, &correlation, settings)?;
    Ok(similar_edges(items, &scores, settings))
}

/// Rebuilds every similar edge from one snapshot of the catalog
///
/// Both models are computed before anything is deleted, so a failure while
/// computing leaves the previous edges in place.
pub async fn recompute(
    store: &dyn GraphStore,
    settings: &SimilaritySettings,
    cancel: &CancellationToken,
) -> AppResult<SimilarityStats> {
    let items = store.snapshot().await?;
    cancel.check()?;

    let item_count = items.len();
    let (settings_owned, cancel_owned) = (settings.clone(), cancel.clone());
    let span = tracing::Span::current();
    let edges = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        compute_edges(&items, &settings_owned, &cancel_owned)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Similarity computation failed: {}", e)))??;
    cancel.check()?;

    let removed = store.clear_similar().await?;
    tracing::info!(removed, "Old similar edges removed");

    for ((a, b), weight) in &edges {
        store.merge_similar(a, b, *weight).await?;
    }

    let stats = SimilarityStats {
        items: item_count,
        removed,
        written: edges.len(),
    };
    tracing::info!(
        items = stats.items,
        written = stats.written,
        "Similar edges written"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::InMemoryStore,
        models::{MediaItem, MediaKind, TextFields},
    };

    fn settings() -> SimilaritySettings {
        SimilaritySettings {
            max_neighbours: 2,
            threshold: 0.25,
            ..Default::default()
        }
    }

    #[test]
    fn test_blend_weights() {
        let text = DMatrix::from_element(2, 2, 1.0);
        let corr = DMatrix::from_element(2, 2, -1.0);

        let blended = blend(&text, &corr, &SimilaritySettings::default()).unwrap();

        assert!((blended[(0, 1)] + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_blend_rejects_mismatched_shapes() {
        let text = DMatrix::from_element(2, 2, 1.0);
        let corr = DMatrix::from_element(3, 3, 1.0);

        assert!(blend(&text, &corr, &SimilaritySettings::default()).is_err());
    }

    #[test]
    fn test_neighbours_exclude_self_and_apply_threshold() {
        let scores = DMatrix::from_row_slice(4, 4, &[
            1.0, 0.9, 0.2, 0.5, //
            0.9, 1.0, 0.3, 0.3, //
            0.2, 0.3, 1.0, 0.1, //
            0.5, 0.3, 0.1, 1.0,
        ]);

        assert_eq!(neighbours(&scores, 0, &settings()), vec![(1, 0.9), (3, 0.5)]);
        assert_eq!(neighbours(&scores, 2, &settings()), vec![(1, 0.3)]);
    }

    #[test]
    fn test_neighbour_ties_keep_snapshot_order() {
        let scores = DMatrix::from_row_slice(4, 4, &[
            1.0, 0.4, 0.4, 0.4, //
            0.4, 1.0, 0.0, 0.0, //
            0.4, 0.0, 1.0, 0.0, //
            0.4, 0.0, 0.0, 1.0,
        ]);

        assert_eq!(neighbours(&scores, 0, &settings()), vec![(1, 0.4), (2, 0.4)]);
    }

    #[test]
    fn test_top_n_applies_before_threshold() {
        let scores = DMatrix::from_row_slice(3, 3, &[
            1.0, 0.2, 0.1, //
            0.2, 1.0, 0.0, //
            0.1, 0.0, 1.0,
        ]);

        assert!(neighbours(&scores, 0, &settings()).is_empty());
    }

    fn snapshot(id: &str, plot: &str) -> ItemSnapshot {
        ItemSnapshot {
            item: MediaItem {
                id: ItemId::new(id),
                slug: id.to_string(),
                title: id.to_string(),
                year: 2000,
                kind: MediaKind::Movie,
                ratings: Default::default(),
                emotions: Default::default(),
                text: TextFields {
                    plot: Some(plot.to_string()),
                    ..Default::default()
                },
                flags: Default::default(),
            },
            genres: vec![],
            categories: vec![],
        }
    }

    /// Text only, since these fixtures carry no ratings or tags
    fn text_settings() -> SimilaritySettings {
        SimilaritySettings {
            text_weight: 1.0,
            correlation_weight: 0.0,
            ..Default::default()
        }
    }

    fn heist_catalog() -> Vec<ItemSnapshot> {
        vec![
            snapshot("1", "a heist crew robs a vault in the city"),
            snapshot("2", "the heist crew plans to rob a vault"),
            snapshot("3", "a farmer tends sheep through a quiet winter"),
            snapshot("4", "winter on the farm, a farmer and his sheep"),
        ]
    }

    #[test]
    fn test_compute_edges_links_shared_vocabulary() {
        let edges = compute_edges(&heist_catalog(), &text_settings(), &CancellationToken::new())
            .unwrap();

        assert_eq!(edges.len(), 2);
        assert!(edges.contains_key(&(ItemId::new("1"), ItemId::new("2"))));
        assert!(edges.contains_key(&(ItemId::new("3"), ItemId::new("4"))));
    }

    #[test]
    fn test_compute_edges_stops_when_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = compute_edges(&heist_catalog(), &text_settings(), &cancel);

        assert!(matches!(result, Err(AppError::Cancelled)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_recompute_leaves_runtime_free_while_scoring() {
        let store = InMemoryStore::new();
        for snapshot in heist_catalog() {
            store.insert_item(snapshot.item).await;
        }
        let settings = text_settings();
        let cancel = CancellationToken::new();

        // The single runtime thread keeps serving this ticker during scoring.
        let ticks = async {
            let mut ticks = 0;
            for _ in 0..3 {
                tokio::task::yield_now().await;
                ticks += 1;
            }
            ticks
        };
        let (stats, ticks) = tokio::join!(recompute(&store, &settings, &cancel), ticks);

        assert_eq!(ticks, 3);
        let stats = stats.unwrap();
        assert_eq!(stats.items, 4);
        assert_eq!(stats.written, store.similar_edges().await.len());
        assert_eq!(stats.written, 2);
    }
}
