//! Model catalog: the embedded preset list plus models discovered at runtime.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::api::ListedModel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_output: Option<String>,
}

impl ModelDescriptor {
    /// Descriptor for an id discovered at runtime, with derived labels.
    pub fn discovered(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: display_name_for(id),
            provider: provider_label_for(id).to_string(),
            cost_input: None,
            cost_output: None,
        }
    }

    /// Placeholder for a selected id that is not in the catalog.
    pub fn unknown(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            provider: "Unknown".to_string(),
            cost_input: None,
            cost_output: None,
        }
    }

    /// "$3/M in · $15/M out" style summary, if any pricing is known.
    pub fn cost_summary(&self) -> Option<String> {
        let input = self.cost_input.as_deref().filter(|c| !c.is_empty());
        let output = self.cost_output.as_deref().filter(|c| !c.is_empty());
        match (input, output) {
            (Some(i), Some(o)) => Some(format!("{i} in · {o} out")),
            (Some(i), None) => Some(i.to_string()),
            (None, Some(o)) => Some(format!("{o} out")),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PresetCatalog {
    models: Vec<ModelDescriptor>,
}

/// Load the preset models embedded in the binary.
pub fn preset_models() -> Vec<ModelDescriptor> {
    const CATALOG_CONTENT: &str = include_str!("../builtin_models.toml");
    let catalog: PresetCatalog =
        toml::from_str(CATALOG_CONTENT).expect("Failed to parse builtin_models.toml");
    catalog.models
}

/// Human label for a model id: last path segment, hyphens to spaces,
/// first letter of every word upper-cased.
pub fn display_name_for(id: &str) -> String {
    let tail = id.rsplit('/').next().filter(|s| !s.is_empty()).unwrap_or(id);
    let spaced = tail.replace('-', " ");

    let mut name = String::with_capacity(spaced.len());
    let mut in_word = false;
    for ch in spaced.chars() {
        let is_word_char = ch.is_ascii_alphanumeric() || ch == '_';
        if is_word_char && !in_word {
            name.extend(ch.to_uppercase());
        } else {
            name.push(ch);
        }
        in_word = is_word_char;
    }
    name
}

/// Provider label: everything before the first slash (the whole id when
/// there is none), or `Other` when that prefix is empty.
pub fn provider_label_for(id: &str) -> &str {
    id.split('/')
        .next()
        .filter(|provider| !provider.is_empty())
        .unwrap_or("Other")
}

/// Presets first, then every discovered id not seen yet, in discovery
/// order. Entries without an id are skipped and presets always win.
pub fn merge_discovered(
    presets: &[ModelDescriptor],
    discovered: &[ListedModel],
) -> Vec<ModelDescriptor> {
    let mut seen: HashSet<&str> = presets.iter().map(|m| m.id.as_str()).collect();
    let mut merged = presets.to_vec();
    for listed in discovered {
        let Some(id) = listed.id() else {
            continue;
        };
        if seen.insert(id) {
            merged.push(ModelDescriptor::discovered(id));
        }
    }
    merged
}

/// Case-insensitive search over name, provider and id.
pub fn filter_models<'a>(models: &'a [ModelDescriptor], query: &str) -> Vec<&'a ModelDescriptor> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return models.iter().collect();
    }
    models
        .iter()
        .filter(|model| {
            model.name.to_lowercase().contains(&needle)
                || model.provider.to_lowercase().contains(&needle)
                || model.id.to_lowercase().contains(&needle)
        })
        .collect()
}
