//! Shared fixtures for the integration tests

#![allow(dead_code)]

use media_topics::topics::Embedder;
use media_topics::{Config, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const DIMENSIONS: usize = 64;

/// Deterministic bag-of-words encoder: every token is hashed into one of
/// `DIMENSIONS` buckets and the vector is l2-normalized. Counts `embed` calls.
pub struct HashingEmbedder {
    pub calls: Arc<AtomicUsize>,
}

impl HashingEmbedder {
    pub fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(0xcbf29ce484222325u64, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x100000001b3)
    })
}

impl Embedder for HashingEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0f32; DIMENSIONS];
                for token in text.split_whitespace() {
                    vector[(fnv1a(&token.to_lowercase()) % DIMENSIONS as u64) as usize] += 1.0;
                }
                let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
                if norm > 0.0 {
                    vector.iter_mut().for_each(|v| *v /= norm);
                }
                vector
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "hashing-test-encoder"
    }
}

const GRAIN: &[&str] = &[
    "grain", "export", "harbour", "wheat", "cargo", "corridor", "farmers", "vessels", "shipment",
    "silos", "harvest", "tonnes",
];

const SHELTER: &[&str] = &[
    "refugees", "shelter", "border", "asylum", "housing", "families", "volunteers", "registration",
    "children", "arrival", "support", "accommodation",
];

/// Maps every text to the same unit vector of `dimensions` components
pub struct ConstantEmbedder {
    pub name: &'static str,
    pub dimensions: usize,
}

impl Embedder for ConstantEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vector = vec![0.0; self.dimensions];
        vector[0] = 1.0;
        Ok(texts.iter().map(|_| vector.clone()).collect())
    }

    fn model_name(&self) -> &str {
        self.name
    }
}

/// A message of twenty topic words, well over one hundred characters
pub fn topic_message(vocabulary: &[&str], seed: usize) -> String {
    (0..20)
        .map(|i| vocabulary[(seed * 7 + i * 5) % vocabulary.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

/// Telegram-style messages about two unrelated subjects
pub fn two_topic_messages(per_topic: usize) -> Vec<String> {
    (0..per_topic)
        .flat_map(|i| [topic_message(GRAIN, i), topic_message(SHELTER, i)])
        .collect()
}

/// Write a telegram export with an `id` and a `messageText` column
pub fn write_telegram_csv(dir: &Path, messages: &[String]) -> PathBuf {
    let path = dir.join("telegram.csv");
    let mut writer = csv::Writer::from_path(&path).unwrap();
    writer.write_record(["id", "messageText"]).unwrap();
    for (i, message) in messages.iter().enumerate() {
        writer.write_record([i.to_string().as_str(), message.as_str()]).unwrap();
    }
    writer.flush().unwrap();
    path
}

/// Default configuration with paths anchored at the crate root
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.vectorizer.stopwords_path =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/stopwords/stopwords.txt");
    config.reducer.n_epochs = Some(100);
    config
}
