//! Recipe corpus loading and normalization.
//!
//! The corpus is a JSON array of recipe records on disk. Loading turns each
//! record into a [`Document`]: a human-readable text rendering (the part that
//! gets chunked and embedded) plus a typed [`RecipeMetadata`] value carried
//! alongside every chunk. Metadata stays typed everywhere in memory; it is
//! serialized to JSON exactly once, at the storage boundary in the index.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// A raw recipe record as found in the corpus file.
///
/// Only `dish_name` and `origin` are required; every other field defaults to
/// empty or absent, and a record missing them still loads as a degraded
/// document rather than failing the whole corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeRecord {
    pub dish_name: String,
    pub origin: String,
    /// ISO-8601 duration, e.g. "PT15M"
    #[serde(default)]
    pub prep_time: Option<String>,
    #[serde(default)]
    pub cook_time: Option<String>,
    #[serde(default)]
    pub total_time: Option<String>,
    #[serde(default)]
    pub servings: Option<u32>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Nutrient name to value, e.g. "calories" -> 320
    #[serde(default)]
    pub nutrition: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Typed metadata carried by a document and copied into each of its chunks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecipeMetadata {
    /// Identity key derived from dish name and origin, disambiguated on collision
    pub id: String,
    pub dish_name: String,
    pub origin: String,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub total_time: Option<String>,
    pub servings: Option<u32>,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub notes: Option<String>,
    pub nutrition: BTreeMap<String, serde_json::Value>,
    pub source_url: Option<String>,
    pub image_url: Option<String>,
}

impl RecipeMetadata {
    /// Serialize for storage. This is the only place metadata becomes a string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from storage, degrading to an empty default on malformed
    /// JSON rather than raising. Lenient by policy: a damaged row should
    /// produce a degraded result, not a failed query.
    pub fn from_json_lossy(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::warn!("Malformed chunk metadata, using defaults: {e}");
            Self::default()
        })
    }
}

/// A normalized recipe document: rendered text content plus typed metadata.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub metadata: RecipeMetadata,
}

/// Load the recipe corpus from a JSON file.
///
/// Produces one [`Document`] per record, in corpus order. A missing file is
/// an immediate, fatal error. Records whose identity keys collide (same dish
/// name and origin) are suffix-disambiguated: the second occurrence gets
/// `_2`, the third `_3`, and so on.
pub fn load_recipes(file_path: &Path) -> Result<Vec<Document>> {
    let raw = std::fs::read_to_string(file_path)
        .with_context(|| format!("recipe corpus not found: {}", file_path.display()))?;

    let records: Vec<RecipeRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid recipe corpus JSON: {}", file_path.display()))?;

    let mut seen: HashMap<String, usize> = HashMap::new();
    let documents = records
        .into_iter()
        .map(|record| {
            let base_id = identity_key(&record.dish_name, &record.origin);
            let count = seen.entry(base_id.clone()).or_insert(0);
            *count += 1;
            let id = if *count == 1 {
                base_id
            } else {
                format!("{base_id}_{count}")
            };
            format_document(record, id)
        })
        .collect::<Vec<_>>();

    tracing::info!("Loaded {} recipes", documents.len());
    Ok(documents)
}

fn identity_key(dish_name: &str, origin: &str) -> String {
    format!("{}_{}", dish_name.replace(' ', "_"), origin)
}

/// Render one record into a structured text document, omitting the sections
/// the record does not supply.
fn format_document(record: RecipeRecord, id: String) -> Document {
    let mut sections = vec![
        format!("Dish: {}", record.dish_name),
        format!("Origin: {}", record.origin),
    ];

    if !record.ingredients.is_empty() {
        sections.push(format!(
            "Ingredients:\n- {}",
            record.ingredients.join("\n- ")
        ));
    }
    if !record.steps.is_empty() {
        let steps = record
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| format!("{}. {}", i + 1, s))
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!("Steps:\n{steps}"));
    }
    if let Some(notes) = &record.notes {
        sections.push(format!("Notes:\n{notes}"));
    }
    if !record.nutrition.is_empty() {
        let lines = record
            .nutrition
            .iter()
            .map(|(k, v)| format!("{}: {}", k, render_value(v)))
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!("Nutrition:\n{lines}"));
    }
    if let Some(source_url) = &record.source_url {
        sections.push(format!("Source: {source_url}"));
    }

    let content = sections.join("\n\n");

    let metadata = RecipeMetadata {
        id,
        dish_name: record.dish_name,
        origin: record.origin,
        prep_time: record.prep_time,
        cook_time: record.cook_time,
        total_time: record.total_time,
        servings: record.servings,
        ingredients: record.ingredients,
        steps: record.steps,
        notes: record.notes,
        nutrition: record.nutrition,
        source_url: record.source_url,
        image_url: record.image_url,
    };

    Document { content, metadata }
}

/// Render a JSON scalar without quoting strings.
pub fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert an ISO-8601 duration like "PT1H30M" to total minutes.
/// Returns None for empty or unparseable input.
pub fn parse_duration_minutes(duration: &str) -> Option<u32> {
    let rest = duration.strip_prefix("PT")?;
    if rest.is_empty() {
        return None;
    }

    let mut minutes = 0u32;
    let mut digits = String::new();
    for ch in rest.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else {
            let value: u32 = digits.parse().ok()?;
            digits.clear();
            match ch {
                'H' => minutes += value * 60,
                'M' => minutes += value,
                'S' => {}
                _ => return None,
            }
        }
    }
    if !digits.is_empty() {
        // Trailing digits without a unit
        return None;
    }
    Some(minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_corpus() -> &'static str {
        r#"[
            {
                "dish_name": "Jollof Rice",
                "origin": "Nigeria",
                "prep_time": "PT15M",
                "cook_time": "PT45M",
                "total_time": "PT1H",
                "servings": 4,
                "ingredients": ["rice", "tomato"],
                "steps": ["Cook rice", "Add tomato"],
                "notes": "Best served hot.",
                "nutrition": {"calories": 320, "protein": "7g"},
                "source_url": "https://example.com/jollof"
            },
            {
                "dish_name": "Sukuma Wiki",
                "origin": "Kenya"
            }
        ]"#
    }

    fn write_corpus(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_produces_one_document_per_record() {
        let file = write_corpus(sample_corpus());
        let documents = load_recipes(file.path()).unwrap();

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].metadata.id, "Jollof_Rice_Nigeria");
        assert_eq!(documents[0].metadata.dish_name, "Jollof Rice");
        assert_eq!(documents[1].metadata.id, "Sukuma_Wiki_Kenya");
    }

    #[test]
    fn test_content_sections() {
        let file = write_corpus(sample_corpus());
        let documents = load_recipes(file.path()).unwrap();

        let content = &documents[0].content;
        assert!(content.starts_with("Dish: Jollof Rice"));
        assert!(content.contains("Origin: Nigeria"));
        assert!(content.contains("Ingredients:\n- rice\n- tomato"));
        assert!(content.contains("Steps:\n1. Cook rice\n2. Add tomato"));
        assert!(content.contains("Notes:\nBest served hot."));
        assert!(content.contains("calories: 320"));
        assert!(content.contains("protein: 7g"));
        assert!(content.contains("Source: https://example.com/jollof"));
    }

    #[test]
    fn test_degraded_record_omits_missing_sections() {
        let file = write_corpus(sample_corpus());
        let documents = load_recipes(file.path()).unwrap();

        let degraded = &documents[1];
        assert_eq!(degraded.content, "Dish: Sukuma Wiki\n\nOrigin: Kenya");
        assert!(degraded.metadata.ingredients.is_empty());
        assert!(degraded.metadata.steps.is_empty());
        assert!(degraded.metadata.notes.is_none());
        assert!(degraded.metadata.nutrition.is_empty());
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = load_recipes(Path::new("/nonexistent/recipes.json")).unwrap_err();
        let io = err
            .downcast_ref::<std::io::Error>()
            .expect("should carry an io error");
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_metadata_round_trip_through_storage_boundary() {
        let file = write_corpus(sample_corpus());
        let documents = load_recipes(file.path()).unwrap();

        let original = &documents[0].metadata;
        let restored = RecipeMetadata::from_json_lossy(&original.to_json().unwrap());

        assert_eq!(&restored, original);
        assert_eq!(restored.ingredients, vec!["rice", "tomato"]);
        assert_eq!(restored.steps, vec!["Cook rice", "Add tomato"]);
        assert_eq!(
            restored.nutrition.get("calories"),
            Some(&serde_json::json!(320))
        );
    }

    #[test]
    fn test_malformed_metadata_degrades_to_default() {
        let restored = RecipeMetadata::from_json_lossy("{not valid json");
        assert_eq!(restored, RecipeMetadata::default());
    }

    #[test]
    fn test_duplicate_identity_keys_are_suffixed() {
        let corpus = r#"[
            {"dish_name": "Jollof Rice", "origin": "Nigeria"},
            {"dish_name": "Jollof Rice", "origin": "Nigeria"},
            {"dish_name": "Jollof Rice", "origin": "Nigeria"}
        ]"#;
        let file = write_corpus(corpus);
        let documents = load_recipes(file.path()).unwrap();

        let ids: Vec<&str> = documents.iter().map(|d| d.metadata.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "Jollof_Rice_Nigeria",
                "Jollof_Rice_Nigeria_2",
                "Jollof_Rice_Nigeria_3"
            ]
        );
    }

    #[test]
    fn test_parse_duration_minutes() {
        assert_eq!(parse_duration_minutes("PT1H30M"), Some(90));
        assert_eq!(parse_duration_minutes("PT45M"), Some(45));
        assert_eq!(parse_duration_minutes("PT2H"), Some(120));
        assert_eq!(parse_duration_minutes(""), None);
        assert_eq!(parse_duration_minutes("PT"), None);
        assert_eq!(parse_duration_minutes("90 minutes"), None);
    }
}
