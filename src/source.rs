//! Data sources understood by both pipelines

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    #[value(name = "telegram")]
    Telegram,
    #[value(name = "twitter")]
    Twitter,
    #[value(name = "google_news")]
    GoogleNews,
    #[value(name = "gdelt")]
    Gdelt,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Telegram => "telegram",
            DataSource::Twitter => "twitter",
            DataSource::GoogleNews => "google_news",
            DataSource::Gdelt => "gdelt",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_names_match_cli_tokens() {
        for source in DataSource::value_variants() {
            let value = source.to_possible_value().unwrap();
            assert_eq!(value.get_name(), source.as_str());
        }
    }

    #[test]
    fn test_parse_google_news() {
        let parsed = DataSource::from_str("google_news", false).unwrap();
        assert_eq!(parsed, DataSource::GoogleNews);
        assert!(DataSource::from_str("google-news", false).is_err());
    }
}
