//! Stoplist-driven paragraph boilerplate removal
//!
//! Markup is split into paragraphs at block-level elements. Every paragraph is
//! first classified on its own (length, stopword density, link density) and
//! then revised using its neighbours, so short fragments surrounded by
//! content survive while navigation and footer debris is dropped.

use crate::cleaning::stoplists::Stoplist;
use crate::config::BoilerplateConfig;
use log::debug;
use scraper::{ElementRef, Html, Node};
use thiserror::Error;

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "caption", "center", "dd", "details",
    "dir", "div", "dl", "dt", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4",
    "h5", "h6", "header", "hr", "html", "li", "main", "menu", "nav", "ol", "p", "pre", "section",
    "summary", "table", "td", "th", "tr", "ul",
];

const IGNORED_TAGS: &[&str] = &[
    "head", "script", "style", "noscript", "iframe", "object", "embed", "select", "option",
    "svg", "template",
];

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

#[derive(Error, Debug, PartialEq)]
pub enum MarkupError {
    #[error("document is empty")]
    EmptyDocument,
    #[error("document has no text paragraphs")]
    NoParagraphs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphClass {
    Good,
    NearGood,
    Short,
    Bad,
}

#[derive(Debug, Clone)]
pub struct Paragraph {
    pub text: String,
    pub link_chars: usize,
    pub heading: bool,
    pub context_free: ParagraphClass,
    pub class: ParagraphClass,
}

impl Paragraph {
    fn new(heading: bool) -> Self {
        Self {
            text: String::new(),
            link_chars: 0,
            heading,
            context_free: ParagraphClass::Bad,
            class: ParagraphClass::Bad,
        }
    }

    pub fn length(&self) -> usize {
        self.text.chars().count()
    }

    pub fn link_density(&self) -> f64 {
        let length = self.length();
        if length == 0 {
            0.0
        } else {
            self.link_chars as f64 / length as f64
        }
    }

    pub fn is_content(&self) -> bool {
        self.class == ParagraphClass::Good
    }
}

#[derive(Default)]
struct ParagraphBuilder {
    paragraphs: Vec<Paragraph>,
    raw: String,
    link_chars: usize,
    heading: bool,
    pending_break: bool,
}

impl ParagraphBuilder {
    fn start(&mut self, heading: bool) {
        self.flush();
        self.heading = heading;
    }

    fn push_text(&mut self, text: &str, in_link: bool) {
        if !text.trim().is_empty() {
            self.pending_break = false;
        }
        if in_link {
            self.link_chars += text.split_whitespace().collect::<Vec<_>>().join(" ").chars().count();
        }
        self.raw.push_str(text);
    }

    fn line_break(&mut self) {
        if self.pending_break {
            self.flush();
        } else {
            self.raw.push(' ');
            self.pending_break = true;
        }
    }

    fn flush(&mut self) {
        let text = self.raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if !text.is_empty() {
            let mut paragraph = Paragraph::new(self.heading);
            paragraph.link_chars = self.link_chars.min(text.chars().count());
            paragraph.text = text;
            self.paragraphs.push(paragraph);
        }
        self.raw.clear();
        self.link_chars = 0;
        self.heading = false;
        self.pending_break = false;
    }

    fn walk(&mut self, element: ElementRef<'_>, in_link: bool) {
        let name = element.value().name();
        if IGNORED_TAGS.contains(&name) {
            return;
        }
        if name == "br" {
            self.line_break();
            return;
        }
        let block = BLOCK_TAGS.contains(&name);
        if block {
            self.start(HEADING_TAGS.contains(&name));
        }
        let in_link = in_link || name == "a";
        for child in element.children() {
            if let Some(child_element) = ElementRef::wrap(child) {
                self.walk(child_element, in_link);
            } else if let Node::Text(text) = child.value() {
                self.push_text(text, in_link);
            }
        }
        if block {
            self.flush();
        }
    }
}

pub struct BoilerplateStripper {
    stoplist: Stoplist,
    config: BoilerplateConfig,
}

impl BoilerplateStripper {
    pub fn new(stoplist: Stoplist, config: BoilerplateConfig) -> Self {
        Self { stoplist, config }
    }

    /// Return the main-content paragraphs of `text` joined by newlines.
    ///
    /// Markup that cannot be segmented, or in which no paragraph qualifies as
    /// content, is returned unchanged.
    pub fn strip(&self, text: &str) -> String {
        match self.classify(text) {
            Ok(paragraphs) => {
                let content: Vec<&str> = paragraphs
                    .iter()
                    .filter(|p| p.is_content())
                    .map(|p| p.text.as_str())
                    .collect();
                if content.is_empty() {
                    debug!("No content paragraphs found, keeping text as is");
                    text.to_string()
                } else {
                    content.join("\n")
                }
            }
            Err(e) => {
                debug!("Boilerplate stripping skipped: {}", e);
                text.to_string()
            }
        }
    }

    /// Segment and classify all paragraphs of a document
    pub fn classify(&self, text: &str) -> Result<Vec<Paragraph>, MarkupError> {
        let mut paragraphs = self.segment(text)?;
        for paragraph in paragraphs.iter_mut() {
            let class = self.classify_context_free(paragraph);
            paragraph.context_free = class;
            paragraph.class = class;
        }
        self.revise(&mut paragraphs);
        Ok(paragraphs)
    }

    fn segment(&self, text: &str) -> Result<Vec<Paragraph>, MarkupError> {
        if text.trim().is_empty() {
            return Err(MarkupError::EmptyDocument);
        }
        let document = Html::parse_document(text);
        let mut builder = ParagraphBuilder::default();
        builder.walk(document.root_element(), false);
        builder.flush();

        if builder.paragraphs.is_empty() {
            return Err(MarkupError::NoParagraphs);
        }
        Ok(builder.paragraphs)
    }

    fn classify_context_free(&self, paragraph: &Paragraph) -> ParagraphClass {
        let length = paragraph.length();
        let stopword_density = self.stoplist.density(&paragraph.text);

        if paragraph.link_density() > self.config.max_link_density {
            ParagraphClass::Bad
        } else if paragraph.text.contains('\u{a9}') || paragraph.text.contains("&copy") {
            ParagraphClass::Bad
        } else if length < self.config.length_low {
            if paragraph.link_chars > 0 {
                ParagraphClass::Bad
            } else {
                ParagraphClass::Short
            }
        } else if stopword_density >= self.config.stopwords_high {
            if length > self.config.length_high {
                ParagraphClass::Good
            } else {
                ParagraphClass::NearGood
            }
        } else if stopword_density >= self.config.stopwords_low {
            ParagraphClass::NearGood
        } else {
            ParagraphClass::Bad
        }
    }

    fn revise(&self, paragraphs: &mut [Paragraph]) {
        // short headings shortly before good content
        for i in 0..paragraphs.len() {
            if paragraphs[i].heading
                && paragraphs[i].class == ParagraphClass::Short
                && self.good_follows(paragraphs, i)
            {
                paragraphs[i].class = ParagraphClass::NearGood;
            }
        }

        // short paragraphs take their class from the neighbourhood
        let revised: Vec<(usize, ParagraphClass)> = (0..paragraphs.len())
            .filter(|&i| paragraphs[i].class == ParagraphClass::Short)
            .map(|i| {
                let prev = prev_neighbour(paragraphs, i, true);
                let next = next_neighbour(paragraphs, i, true);
                let class = match (prev, next) {
                    (ParagraphClass::Good, ParagraphClass::Good) => ParagraphClass::Good,
                    (ParagraphClass::Bad, ParagraphClass::Bad) => ParagraphClass::Bad,
                    _ if (prev == ParagraphClass::Bad
                        && prev_neighbour(paragraphs, i, false) == ParagraphClass::NearGood)
                        || (next == ParagraphClass::Bad
                            && next_neighbour(paragraphs, i, false) == ParagraphClass::NearGood) =>
                    {
                        ParagraphClass::Good
                    }
                    _ => ParagraphClass::Bad,
                };
                (i, class)
            })
            .collect();
        for (i, class) in revised {
            paragraphs[i].class = class;
        }

        // near-good paragraphs survive unless boxed in by boilerplate
        let revised: Vec<(usize, ParagraphClass)> = (0..paragraphs.len())
            .filter(|&i| paragraphs[i].class == ParagraphClass::NearGood)
            .map(|i| {
                let prev = prev_neighbour(paragraphs, i, true);
                let next = next_neighbour(paragraphs, i, true);
                if prev == ParagraphClass::Bad && next == ParagraphClass::Bad {
                    (i, ParagraphClass::Bad)
                } else {
                    (i, ParagraphClass::Good)
                }
            })
            .collect();
        for (i, class) in revised {
            paragraphs[i].class = class;
        }

        // rescue headings that were not boilerplate on their own
        for i in 0..paragraphs.len() {
            if paragraphs[i].heading
                && paragraphs[i].class == ParagraphClass::Bad
                && paragraphs[i].context_free != ParagraphClass::Bad
                && self.good_follows(paragraphs, i)
            {
                paragraphs[i].class = ParagraphClass::Good;
            }
        }
    }

    fn good_follows(&self, paragraphs: &[Paragraph], index: usize) -> bool {
        let mut distance = 0;
        for paragraph in &paragraphs[index + 1..] {
            if distance > self.config.max_heading_distance {
                break;
            }
            if paragraph.class == ParagraphClass::Good {
                return true;
            }
            distance += paragraph.length();
        }
        false
    }
}

fn neighbour<'a>(
    mut candidates: impl Iterator<Item = &'a Paragraph>,
    ignore_near_good: bool,
) -> ParagraphClass {
    candidates
        .find(|p| {
            p.class != ParagraphClass::Short
                && !(ignore_near_good && p.class == ParagraphClass::NearGood)
        })
        .map(|p| p.class)
        .unwrap_or(ParagraphClass::Bad)
}

fn prev_neighbour(paragraphs: &[Paragraph], index: usize, ignore_near_good: bool) -> ParagraphClass {
    neighbour(paragraphs[..index].iter().rev(), ignore_near_good)
}

fn next_neighbour(paragraphs: &[Paragraph], index: usize, ignore_near_good: bool) -> ParagraphClass {
    neighbour(paragraphs[index + 1..].iter(), ignore_near_good)
}
