//! Input handling: CSV tables, corpora and per-source adapters

pub mod corpus;
pub mod sources;
pub mod table;

pub use corpus::{Corpus, Document, DocumentMetadata};
pub use sources::{adapter_for, InferenceTable, LoadedCorpus, SourceAdapter};
pub use table::CsvTable;
