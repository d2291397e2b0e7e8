//! Marker-based partition of a generated report.
//!
//! Markers are literal substrings located by first occurrence, each searched
//! after the end of the previous one. Text before the first marker is dropped.
//! If any marker cannot be found in order, nothing is partially split: the
//! whole text becomes a single fallback section.
//!
//! There is no escaping. A marker that the model repeats inside an earlier
//! section's prose starts the next section at that point.

use serde::Serialize;

/// Key the fallback section is reported under.
pub const FALLBACK_KEY: &str = "report";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub marker: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportSections {
    Segmented { sections: Vec<Section> },
    Fallback { text: String },
}

pub fn split_sections<M: AsRef<str>>(raw: &str, markers: &[M]) -> ReportSections {
    match locate(raw, markers) {
        Some(bounds) => {
            let sections = bounds
                .iter()
                .enumerate()
                .map(|(i, &(_, body_start))| {
                    let body_end = bounds.get(i + 1).map_or(raw.len(), |&(next, _)| next);
                    Section {
                        marker: markers[i].as_ref().to_string(),
                        text: raw[body_start..body_end].to_string(),
                    }
                })
                .collect();
            ReportSections::Segmented { sections }
        }
        None => ReportSections::Fallback { text: raw.to_string() },
    }
}

/// Byte ranges `(marker_start, marker_end)` for every marker, in order.
fn locate<M: AsRef<str>>(raw: &str, markers: &[M]) -> Option<Vec<(usize, usize)>> {
    if markers.is_empty() {
        return None;
    }

    let mut bounds = Vec::with_capacity(markers.len());
    let mut cursor = 0;
    for marker in markers {
        let marker = marker.as_ref();
        if marker.is_empty() {
            return None;
        }
        let start = cursor + raw[cursor..].find(marker)?;
        let end = start + marker.len();
        bounds.push((start, end));
        cursor = end;
    }
    Some(bounds)
}

impl ReportSections {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ReportSections::Fallback { .. })
    }

    pub fn len(&self) -> usize {
        match self {
            ReportSections::Segmented { sections } => sections.len(),
            ReportSections::Fallback { .. } => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Section text by marker, or by [`FALLBACK_KEY`] for a fallback result.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == key).map(|(_, text)| text)
    }

    /// `(key, text)` pairs in report order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_> {
        match self {
            ReportSections::Segmented { sections } => {
                Box::new(sections.iter().map(|s| (s.marker.as_str(), s.text.as_str())))
            }
            ReportSections::Fallback { text } => Box::new(std::iter::once((FALLBACK_KEY, text.as_str()))),
        }
    }

    /// Reassemble marker-delimited text. Splitting the result on the same
    /// markers gives these sections back.
    pub fn join(&self) -> String {
        match self {
            ReportSections::Segmented { sections } => sections
                .iter()
                .map(|s| format!("{}{}", s.marker, s.text))
                .collect(),
            ReportSections::Fallback { text } => text.clone(),
        }
    }
}
