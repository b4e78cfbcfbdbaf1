// src/heuristics/mod.rs

mod analytes;

pub use analytes::{AnalytePattern, AnalyteRule, ContaminantExtractor, Unit, builtin_rules};

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Problems building an analyte table.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("analyte {name:?} has an invalid label pattern: {source}")]
    InvalidLabel {
        name: String,
        #[source]
        source: regex::Error,
    },
    #[error("analyte {0:?} appears more than once in the table")]
    DuplicateName(String),
}

/// Readings found in one document, keyed by canonical analyte name.
///
/// Only analytes present in the text have an entry; enumeration follows
/// the analyte table, not the order of appearance in the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedValues {
    readings: Vec<(String, f64)>,
}

impl ParsedValues {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.readings
            .iter()
            .find(|(k, _)| k == name)
            .map(|&(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.readings.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// How many analytes were found out of the table size.
    pub fn coverage(&self, extractor: &ContaminantExtractor) -> (usize, usize) {
        (self.readings.len(), extractor.names().count())
    }

    // First value recorded for a name is kept.
    fn record(&mut self, name: &str, value: f64) {
        if self.get(name).is_none() {
            self.readings.push((name.to_string(), value));
        }
    }
}

impl Serialize for ParsedValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.readings.len()))?;
        for (name, value) in &self.readings {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Extract analyte readings from raw report text with the built-in table.
pub fn parse_contaminant_values(text: &str) -> ParsedValues {
    ContaminantExtractor::builtin().extract(text)
}
