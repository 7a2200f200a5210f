//! Line-level and document-level content filters

use crate::config::NewsCleaningConfig;
use aho_corasick::AhoCorasick;
use log::debug;

/// Case-insensitive substring matcher over a fixed phrase list
pub struct PhraseMatcher {
    automaton: Option<AhoCorasick>,
}

impl PhraseMatcher {
    pub fn new(phrases: &[String]) -> Self {
        let patterns: Vec<String> = phrases
            .iter()
            .map(|p| p.to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        let automaton = if patterns.is_empty() {
            None
        } else {
            // Patterns are plain literals; building can only fail on size limits.
            AhoCorasick::new(&patterns).ok()
        };

        Self { automaton }
    }

    pub fn is_empty(&self) -> bool {
        self.automaton.is_none()
    }

    pub fn matches(&self, text: &str) -> bool {
        match &self.automaton {
            Some(ac) => ac.is_match(&text.to_lowercase()),
            None => false,
        }
    }
}

/// Why a line was rejected by [`LineFilter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRejection {
    TooFewWords,
    LeadingWhitespace,
    AttributionPrefix,
    DeniedPhrase,
}

/// Ordered heuristics that drop boilerplate lines from scraped articles
pub struct LineFilter {
    min_words: usize,
    skip_prefixes: Vec<String>,
    deny_list: PhraseMatcher,
}

impl LineFilter {
    pub fn new(config: &NewsCleaningConfig) -> Self {
        Self {
            min_words: config.min_line_words,
            skip_prefixes: config.skip_prefixes.clone(),
            deny_list: PhraseMatcher::new(&config.deny_phrases),
        }
    }

    /// Check a single line; the first failing rule wins
    pub fn check(&self, line: &str) -> Result<(), LineRejection> {
        if line.split_whitespace().count() < self.min_words {
            return Err(LineRejection::TooFewWords);
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            return Err(LineRejection::LeadingWhitespace);
        }
        if self.skip_prefixes.iter().any(|p| line.starts_with(p.as_str())) {
            return Err(LineRejection::AttributionPrefix);
        }
        if self.deny_list.matches(line) {
            return Err(LineRejection::DeniedPhrase);
        }
        Ok(())
    }

    pub fn keep(&self, line: &str) -> bool {
        match self.check(line) {
            Ok(()) => true,
            Err(reason) => {
                debug!("Dropping line ({:?}): {}", reason, line.trim_end());
                false
            }
        }
    }

    /// Filter all lines of an article, keeping the survivors in order
    pub fn filter_lines<'a>(&self, article: &'a str) -> Vec<&'a str> {
        article
            .lines()
            .filter(|line| self.keep(line))
            .collect()
    }
}

/// Keeps only articles that mention at least one configured keyword
pub struct RelevanceFilter {
    keywords: PhraseMatcher,
}

impl RelevanceFilter {
    pub fn new(keywords: &[String]) -> Self {
        Self {
            keywords: PhraseMatcher::new(keywords),
        }
    }

    pub fn is_relevant(&self, article: &str) -> bool {
        self.keywords.is_empty() || self.keywords.matches(article)
    }
}

/// Drops documents in which no token is longer than `min_token_length` characters
#[derive(Debug, Clone, Copy)]
pub struct ShortContentFilter {
    min_token_length: usize,
}

impl Default for ShortContentFilter {
    fn default() -> Self {
        Self::new(5)
    }
}

impl ShortContentFilter {
    pub fn new(min_token_length: usize) -> Self {
        Self { min_token_length }
    }

    pub fn has_real_word(&self, text: &str) -> bool {
        text.split_whitespace()
            .any(|token| token.chars().count() > self.min_token_length)
    }

    pub fn apply(&self, text: String) -> Option<String> {
        if self.has_real_word(&text) {
            Some(text)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_line_word_boundary() {
        let filter = LineFilter::new(&NewsCleaningConfig::default());

        assert!(filter.keep(&words(10)));
        assert_eq!(filter.check(&words(9)), Err(LineRejection::TooFewWords));
    }

    #[test]
    fn test_line_rules_in_order() {
        let filter = LineFilter::new(&NewsCleaningConfig::default());
        let body = words(12);

        assert_eq!(
            filter.check(&format!(" {}", body)),
            Err(LineRejection::LeadingWhitespace)
        );
        assert_eq!(
            filter.check(&format!("\t{}", body)),
            Err(LineRejection::LeadingWhitespace)
        );
        assert_eq!(
            filter.check(&format!("Copyright {}", body)),
            Err(LineRejection::AttributionPrefix)
        );
        assert_eq!(
            filter.check(&format!("© 2023 {}", body)),
            Err(LineRejection::AttributionPrefix)
        );
        assert_eq!(
            filter.check(&format!("{} please SUBSCRIBE today", body)),
            Err(LineRejection::DeniedPhrase)
        );
        assert_eq!(filter.check(&body), Ok(()));
    }

    #[test]
    fn test_deny_list_is_substring_match() {
        let filter = LineFilter::new(&NewsCleaningConfig::default());
        // "Abo" hides inside "Abonnenten"
        let line = format!("{} unsere Abonnenten lesen mehr", words(10));
        assert!(!filter.keep(&line));
    }

    #[test]
    fn test_filter_lines_keeps_order() {
        let filter = LineFilter::new(&NewsCleaningConfig::default());
        let article = format!("{}\nshort line\n{} end", words(10), words(11));

        let kept = filter.filter_lines(&article);
        assert_eq!(kept.len(), 2);
        assert!(kept[1].ends_with("end"));
    }

    #[test]
    fn test_relevance_filter_unicode_case() {
        let filter = RelevanceFilter::new(&["flüchtling".to_string()]);
        assert!(filter.is_relevant("Die FLÜCHTLINGE kamen an"));
        assert!(!filter.is_relevant("Nothing relevant here"));

        let open = RelevanceFilter::new(&[]);
        assert!(open.is_relevant("anything"));
    }

    #[test]
    fn test_short_content_filter() {
        let filter = ShortContentFilter::default();

        assert_eq!(filter.apply("a bb ccc".to_string()), None);
        assert_eq!(
            filter.apply("a bb longword".to_string()),
            Some("a bb longword".to_string())
        );
        // exactly five characters is not enough
        assert_eq!(filter.apply("hello world".to_string()), None);
        assert_eq!(filter.apply(String::new()), None);
    }

    #[test]
    fn test_short_content_counts_characters_not_bytes() {
        let filter = ShortContentFilter::default();
        // five characters, ten bytes
        assert!(!filter.has_real_word(&"привет"[..10]));
        assert!(filter.has_real_word("привет"));
    }
}
