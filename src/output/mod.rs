//! Result artifacts written next to the persisted model

pub mod visualize;
pub mod workbook;

pub use visualize::write_visualizations;
pub use workbook::{write_representative_docs, write_topic_info, INFERENCE_FILE};
