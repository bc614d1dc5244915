//! Text vector model over item documents.

mod stopwords;
pub mod tokenize;
pub mod vector;

pub use tokenize::{document, Tokenizer};
pub use vector::{cosine_matrix, latent, text_similarity, Corpus};
