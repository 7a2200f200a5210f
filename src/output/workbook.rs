//! Tabular result exports: representative documents workbook and topic table

use crate::error::Result;
use crate::input::table::CsvTable;
use crate::topics::model::TopicModel;
use log::info;
use rust_xlsxwriter::{Format, Workbook};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const REPRESENTATIVE_DOCS_FILE: &str = "representative_docs.xlsx";
pub const TOPIC_INFO_FILE: &str = "topic_info.csv";
pub const INFERENCE_FILE: &str = "df_model.csv";

const MAX_SHEET_NAME: usize = 31;
const MAX_CELL_CHARS: usize = 32_767;
const INVALID_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Excel-safe, unique worksheet name derived from a topic name
pub fn sheet_name(name: &str, taken: &mut HashSet<String>) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches('\'');
    let base: String = if cleaned.is_empty() {
        "topic".to_string()
    } else {
        cleaned.chars().take(MAX_SHEET_NAME).collect()
    };

    let mut candidate = base.clone();
    let mut counter = 1;
    // Excel compares sheet names case-insensitively
    while taken.contains(&candidate.to_lowercase()) {
        let suffix = format!("~{}", counter);
        let keep = MAX_SHEET_NAME - suffix.chars().count();
        candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
        counter += 1;
    }
    taken.insert(candidate.to_lowercase());
    candidate
}

/// One sheet per topic (outlier topic included) with its representative documents
pub fn write_representative_docs(model: &TopicModel, output_dir: &Path) -> Result<PathBuf> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let mut taken = HashSet::new();

    for topic in model.topic_info() {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name(&topic.name, &mut taken))?;
        worksheet.write_string_with_format(0, 0, "message", &header)?;
        for (row, doc) in topic.representative_docs.iter().enumerate() {
            let text: String = doc.chars().take(MAX_CELL_CHARS).collect();
            worksheet.write_string(row as u32 + 1, 0, text)?;
        }
        worksheet.set_column_width(0, 100)?;
    }
    if model.topic_info().is_empty() {
        workbook.add_worksheet().set_name("topics")?;
    }

    let path = output_dir.join(REPRESENTATIVE_DOCS_FILE);
    workbook.save(&path)?;
    info!("Wrote {}", path.display());
    Ok(path)
}

/// `Topic, Count, Name, Representation, Representative_Docs`; list columns are JSON arrays
pub fn write_topic_info(model: &TopicModel, output_dir: &Path) -> Result<PathBuf> {
    let mut table = CsvTable::new(
        ["Topic", "Count", "Name", "Representation", "Representative_Docs"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    for topic in model.topic_info() {
        table.push_row(vec![
            topic.id.to_string(),
            topic.count.to_string(),
            topic.name.clone(),
            serde_json::to_string(&topic.words())?,
            serde_json::to_string(&topic.representative_docs)?,
        ]);
    }

    let path = output_dir.join(TOPIC_INFO_FILE);
    table.write(&path)?;
    info!("Wrote {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_names_are_sanitized_truncated_and_unique() {
        let mut taken = HashSet::new();
        let long = "0_ukraine_grain_export_agreement_black_sea";

        let first = sheet_name(long, &mut taken);
        assert_eq!(first, "0_ukraine_grain_export_agreemen");
        assert_eq!(first.chars().count(), 31);

        let second = sheet_name(long, &mut taken);
        assert_ne!(first, second);
        assert!(second.chars().count() <= 31);
        assert!(second.ends_with("~1"));

        let third = sheet_name(&long.to_uppercase(), &mut taken);
        assert!(third.ends_with("~2"));

        assert_eq!(sheet_name("1_a/b:c[d]", &mut taken), "1_a_b_c_d_");
        assert_eq!(sheet_name("''", &mut taken), "topic");
    }
}
