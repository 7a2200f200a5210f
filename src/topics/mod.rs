//! Topic modeling: vectorization, embedding, manifold reduction, density
//! clustering, keyword extraction and persistence

pub mod backend;
pub mod ctfidf;
pub mod embedder;
pub mod hdbscan;
pub mod linkage;
pub mod model;
pub mod pca;
pub mod persist;
pub mod reduction;
pub mod similarity;
pub mod umap;
pub mod vectorizer;

pub use backend::ComputeBackend;
pub use embedder::{Embedder, Model2VecEmbedder};
pub use model::{TopicAssignment, TopicModel, TopicModeler, TopicSummary};
pub use persist::{model_dir, MODEL_DIR_NAME};
pub use reduction::KCluster;
pub use vectorizer::{load_stopwords, CountVectorizer};
