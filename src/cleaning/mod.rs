//! Text cleaning: URL removal, line heuristics, boilerplate stripping and
//! short-content filtering

pub mod boilerplate;
pub mod cleaner;
pub mod filters;
pub mod stoplists;
pub mod text_processor;

pub use boilerplate::BoilerplateStripper;
pub use cleaner::{CleaningReport, TextCleaner};
pub use filters::{LineFilter, RelevanceFilter, ShortContentFilter};
pub use stoplists::Stoplist;
pub use text_processor::TextProcessor;
