use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::LoadError;

/// Named groups of region ids for bulk coloring, plus display labels.
///
/// Wire form: `{"groups": {name: [ids]}, "labels": {name: label}}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PresetTable {
    groups: BTreeMap<String, Vec<String>>,
    labels: BTreeMap<String, String>,
}

impl PresetTable {
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn group(&self, name: &str) -> Option<&[String]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    /// Label for a group, falling back to its name.
    pub fn label<'a>(&'a self, name: &'a str) -> &'a str {
        self.labels.get(name).map_or(name, String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Insert or replace a group. Returns the number of ids stored.
    pub fn insert_group(&mut self, name: &str, ids: impl IntoIterator<Item = String>) -> usize {
        let ids: Vec<String> = ids.into_iter().collect();
        let count = ids.len();
        self.groups.insert(name.to_string(), ids);
        count
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum LocaleEntry {
    Translated(BTreeMap<String, String>),
    Plain(String),
}

impl LocaleEntry {
    fn get(&self, lang: &str) -> Option<&str> {
        match self {
            Self::Translated(by_lang) => by_lang
                .get(lang)
                .map(String::as_str)
                .filter(|s| !s.is_empty()),
            Self::Plain(text) => Some(text.as_str()),
        }
    }
}

/// UI strings and raw geographic names, translated per language.
///
/// Wire form: `{"ui": {key: {"en": .., "zh": ..}}, "geo": {raw: {"en": .., "zh": ..} | string}}`.
/// Every lookup degrades to the raw input when no translation exists.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LocaleTable {
    ui: BTreeMap<String, LocaleEntry>,
    geo: BTreeMap<String, LocaleEntry>,
}

impl LocaleTable {
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn geo_name<'a>(&'a self, raw: &'a str, lang: &str) -> &'a str {
        self.geo.get(raw).and_then(|e| e.get(lang)).unwrap_or(raw)
    }

    pub fn ui<'a>(&'a self, key: &'a str, lang: &str) -> &'a str {
        self.ui.get(key).and_then(|e| e.get(lang)).unwrap_or(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_parse_and_fall_back_to_names() {
        let table = PresetTable::from_json(
            r#"{"groups": {"benelux": ["BE_1", "NL_2", "LU_1"], "iberia": ["ES_1"]}, "labels": {"benelux": "Benelux"}}"#,
        )
        .expect("presets parse");

        assert_eq!(table.group("benelux").map(<[String]>::len), Some(3));
        assert_eq!(table.label("benelux"), "Benelux");
        assert_eq!(table.label("iberia"), "iberia");
        assert_eq!(table.names().collect::<Vec<_>>(), ["benelux", "iberia"]);
        assert!(table.group("missing").is_none());
    }

    #[test]
    fn locales_degrade_to_raw_names() {
        let table = LocaleTable::from_json(
            r#"{"ui": {"fill": {"en": "Fill", "zh": "填充"}}, "geo": {"Bayern": {"en": "Bavaria", "zh": ""}, "Wien": "Vienna"}}"#,
        )
        .expect("locales parse");

        assert_eq!(table.geo_name("Bayern", "en"), "Bavaria");
        assert_eq!(table.geo_name("Bayern", "zh"), "Bayern");
        assert_eq!(table.geo_name("Wien", "zh"), "Vienna");
        assert_eq!(table.geo_name("Paris", "en"), "Paris");
        assert_eq!(table.ui("fill", "zh"), "填充");
        assert_eq!(table.ui("erase", "en"), "erase");
    }

    #[test]
    fn empty_documents_are_valid() {
        assert!(PresetTable::from_json("{}").expect("parses").is_empty());
        assert_eq!(LocaleTable::from_json("{}").expect("parses").geo_name("X", "en"), "X");
    }
}
