//! Text vector space: bag of words, TF-IDF weighting, rank-K latent space
//! and pairwise cosine similarity.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, SymmetricEigen};

use super::tokenize::Tokenizer;

/// Eigenvalues below this fraction of the largest are treated as zero
const RANK_TOLERANCE: f64 = 1e-10;

/// Filtered vocabulary and per-document term counts
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    /// Term → column index, in sorted term order
    pub vocabulary: BTreeMap<String, usize>,
    /// Sparse bag of words per document: (term index, count)
    pub documents: Vec<Vec<(usize, u32)>>,
}

impl Corpus {
    /// Tokenizes every document and drops stop words and hapax legomena
    ///
    /// Hapax here means a term occurring exactly once across the whole
    /// corpus, which needs the first pass over all documents.
    pub fn build(documents: &[String], tokenizer: &Tokenizer) -> Self {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenizer.tokens(d)).collect();

        let mut frequency: BTreeMap<&str, u32> = BTreeMap::new();
        for token in tokenized.iter().flatten() {
            *frequency.entry(token.as_str()).or_default() += 1;
        }

        let vocabulary: BTreeMap<String, usize> = frequency
            .into_iter()
            .filter(|(term, count)| *count > 1 && !tokenizer.is_stop_word(term))
            .enumerate()
            .map(|(index, (term, _))| (term.to_string(), index))
            .collect();

        let documents = tokenized
            .iter()
            .map(|tokens| {
                let mut counts: BTreeMap<usize, u32> = BTreeMap::new();
                for index in tokens.iter().filter_map(|t| vocabulary.get(t)) {
                    *counts.entry(*index).or_default() += 1;
                }
                counts.into_iter().collect()
            })
            .collect();

        Self {
            vocabulary,
            documents,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Document × term TF-IDF matrix, each row L2-normalized
    ///
    /// Weight is raw count × log2(N / df). Terms present in every document
    /// weigh zero.
    pub fn tfidf(&self) -> DMatrix<f64> {
        let n = self.documents.len();
        let m = self.vocabulary.len();
        let mut matrix = DMatrix::zeros(n, m);
        if n == 0 || m == 0 {
            return matrix;
        }

        let mut df = vec![0u32; m];
        for (index, _) in self.documents.iter().flatten() {
            df[*index] += 1;
        }

        for (row, document) in self.documents.iter().enumerate() {
            for (index, count) in document {
                let idf = (n as f64 / f64::from(df[*index])).log2();
                matrix[(row, *index)] = f64::from(*count) * idf;
            }
            normalize_row(&mut matrix, row);
        }

        matrix
    }
}

fn normalize_row(matrix: &mut DMatrix<f64>, row: usize) {
    let norm = matrix.row(row).norm();
    if norm > 0.0 {
        let mut r = matrix.row_mut(row);
        r /= norm;
    }
}

/// Projects document rows onto the top `rank` singular directions
///
/// Computes the truncated SVD through the eigendecomposition of whichever
/// Gram matrix is smaller. Returned rows are `U_k · S_k`, so cosine between
/// rows equals cosine in the latent space. `rank` is clamped to the number
/// of non-zero singular values.
pub fn latent(weights: &DMatrix<f64>, rank: usize) -> DMatrix<f64> {
    let (n, m) = weights.shape();
    if n == 0 || m == 0 || rank == 0 {
        return DMatrix::zeros(n, 0);
    }

    let by_documents = n <= m;
    let gram = if by_documents {
        weights * weights.transpose()
    } else {
        weights.transpose() * weights
    };

    let eigen = SymmetricEigen::new(gram);
    let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
    order.sort_by(|a, b| eigen.eigenvalues[*b].total_cmp(&eigen.eigenvalues[*a]));

    let largest = order
        .first()
        .map(|i| eigen.eigenvalues[*i].max(0.0))
        .unwrap_or(0.0);
    let kept: Vec<usize> = order
        .into_iter()
        .filter(|i| largest > 0.0 && eigen.eigenvalues[*i] > largest * RANK_TOLERANCE)
        .take(rank)
        .collect();

    let mut projected = DMatrix::zeros(n, kept.len());
    for (column, index) in kept.iter().enumerate() {
        let vector = eigen.eigenvectors.column(*index);
        let values = if by_documents {
            // Gram eigenvector is a left singular vector; scale by the singular value.
            vector * eigen.eigenvalues[*index].max(0.0).sqrt()
        } else {
            // Right singular vector; A · v already equals u · s.
            weights * vector
        };
        projected.set_column(column, &values);
    }
    projected
}

/// Pairwise cosine similarity of rows; rows with zero norm score 0 everywhere
pub fn cosine_matrix(vectors: &DMatrix<f64>) -> DMatrix<f64> {
    let mut unit = vectors.clone();
    for row in 0..unit.nrows() {
        normalize_row(&mut unit, row);
    }
    &unit * unit.transpose()
}

/// Text similarity of every document pair
pub fn text_similarity(documents: &[String], rank: usize) -> DMatrix<f64> {
    let corpus = Corpus::build(documents, &Tokenizer::english());
    let weights = corpus.tfidf();
    let latent = latent(&weights, rank);

    tracing::info!(
        documents = corpus.len(),
        terms = corpus.vocabulary.len(),
        rank = latent.ncols(),
        "Text model built"
    );

    cosine_matrix(&latent)
}
