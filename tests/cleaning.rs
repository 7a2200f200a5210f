//! End-to-end tests of the cleaning pipeline

use media_topics::input::CsvTable;
use media_topics::pipeline::CleaningPipeline;
use media_topics::{Config, DataSource, MediaTopicsError};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_telegram_cleaning_keeps_only_real_messages() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("raw.csv");
    fs::write(
        &input,
        "id,messageText\n\
         1,short\n\
         2,\"this is a   definitely long enough https://t.me/channel/42 message with real words\"\n\
         3,\n",
    )
    .unwrap();
    let output = dir.path().join("clean").join("telegram_clean.csv");

    let report = CleaningPipeline::new(Config::default())
        .run(DataSource::Telegram, &input, &output, None)
        .unwrap();
    assert_eq!(report.total, 3);
    assert_eq!(report.kept, 1);
    assert_eq!(report.dropped(), 2);

    let table = CsvTable::read(&output).unwrap();
    assert_eq!(table.headers(), ["id", "messageText"]);
    assert_eq!(table.len(), 1);
    assert_eq!(table.cell(0, 0), Some("2"));
    assert_eq!(
        table.cell(0, 1),
        Some("this is a definitely long enough message with real words")
    );
}

#[test]
fn test_news_cleaning_line_length_boundary() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("articles");
    fs::create_dir(&input).unwrap();
    fs::write(
        input.join("Ten words_de_de.txt"),
        "the ukrainian family found a new home in the city\nCopyright 2023 some newspaper group with many rights reserved\n",
    )
    .unwrap();
    fs::write(
        input.join("Nine words_de_de.txt"),
        "the ukrainian family found a new home in town\n",
    )
    .unwrap();
    let output = dir.path().join("cleaned");

    let report = CleaningPipeline::new(Config::default())
        .run(DataSource::GoogleNews, &input, &output, None)
        .unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.kept, 1);

    let kept = fs::read_to_string(output.join("Ten words_de_de.txt")).unwrap();
    assert_eq!(kept, "the ukrainian family found a new home in the city");
    assert!(!output.join("Nine words_de_de.txt").exists());
}

#[test]
fn test_news_cleaning_reconciles_metadata() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("articles");
    fs::create_dir(&input).unwrap();
    fs::write(
        input.join("Kept story_de_de.txt"),
        "the ukrainian family found a new home in the city\n",
    )
    .unwrap();
    let metadata = dir.path().join("metadata.csv");
    fs::write(
        &metadata,
        "title,alpha2_code,language_code\nKept story,de,de\nMissing story,at,de\n",
    )
    .unwrap();

    let report = CleaningPipeline::new(Config::default())
        .run(DataSource::GoogleNews, &input, &dir.path().join("cleaned"), Some(&metadata))
        .unwrap();

    let reconciled = report.metadata_output.unwrap();
    assert_eq!(reconciled, dir.path().join("metadata_clean.csv"));
    let table = CsvTable::read(&reconciled).unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.cell(0, 0), Some("Kept story"));
}

#[test]
fn test_unsupported_sources_fail_loudly() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tweets.csv");
    fs::write(&input, "text\nsome tweet about grain exports and shipping\n").unwrap();
    let pipeline = CleaningPipeline::new(Config::default());

    let twitter = pipeline.run(DataSource::Twitter, &input, &dir.path().join("out.csv"), None);
    assert!(matches!(
        twitter,
        Err(MediaTopicsError::Unsupported {
            data_source: DataSource::Twitter,
            operation: "cleaning"
        })
    ));

    let gdelt = pipeline.run(DataSource::Gdelt, &input, &dir.path().join("out.csv"), None);
    assert!(matches!(
        gdelt,
        Err(MediaTopicsError::Unsupported {
            data_source: DataSource::Gdelt,
            ..
        })
    ));
    assert!(!dir.path().join("out.csv").exists());
}

#[test]
fn test_missing_input_is_rejected() {
    let dir = TempDir::new().unwrap();
    let result = CleaningPipeline::new(Config::default()).run(
        DataSource::Telegram,
        &dir.path().join("absent.csv"),
        &dir.path().join("out.csv"),
        None,
    );
    assert!(matches!(result, Err(MediaTopicsError::InvalidInput(_))));
}
