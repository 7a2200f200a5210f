//! URL removal and whitespace normalization

use regex::Regex;

pub struct TextProcessor {
    url_regex: Regex,
    whitespace_regex: Regex,
}

impl Default for TextProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextProcessor {
    pub fn new() -> Self {
        let url_regex = Regex::new(r"https?://\S+").expect("Invalid URL regex");
        let whitespace_regex = Regex::new(r"\s+").expect("Invalid whitespace regex");

        Self {
            url_regex,
            whitespace_regex,
        }
    }

    /// Replace every `http(s)://` token with a single space
    pub fn strip_urls(&self, text: &str) -> String {
        self.url_regex.replace_all(text, " ").into_owned()
    }

    /// Collapse whitespace runs into one space and trim the ends
    pub fn normalize_whitespace(&self, text: &str) -> String {
        self.whitespace_regex.replace_all(text, " ").trim().to_string()
    }

    pub fn contains_url(&self, text: &str) -> bool {
        self.url_regex.is_match(text)
    }

    pub fn word_count(text: &str) -> usize {
        text.split_whitespace().count()
    }
}
