use chrono::NaiveDateTime;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::portal::cleaner::parse_detail_link;
use crate::portal::segments::Segment;

// ── Installment ───────────────────────────────────────────────────────────────

/// One payment period. Field names and order come from the segment schema,
/// so records of one segment always share the same keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallmentRecord {
    fields: Vec<(&'static str, String)>,
}

impl InstallmentRecord {
    pub fn push(&mut self, name: &'static str, value: String) {
        self.fields.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(k, _)| *k).collect()
    }
}

impl Serialize for InstallmentRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

// ── Benefit card ──────────────────────────────────────────────────────────────

/// The single data row shown under a card's title.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SummaryFields {
    pub id: String, // NIS
    pub name: String,
    pub total_received: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BenefitCard {
    #[serde(rename = "type")]
    pub title: String,
    pub segment: Segment,
    pub benefit_id: String,
    pub detail_url: String,
    #[serde(rename = "summary_fields")]
    pub summary: SummaryFields,
    pub installments: Vec<InstallmentRecord>,
}

impl BenefitCard {
    /// Segment and benefit id are taken from the detail link; a link that
    /// does not parse yields an unknown segment with an empty id.
    pub fn new(title: String, detail_url: String, summary: SummaryFields) -> Self {
        let (slug, benefit_id) = parse_detail_link(&detail_url).unwrap_or_default();
        Self {
            title,
            segment: Segment::from_slug(&slug),
            benefit_id,
            detail_url,
            summary,
            installments: Vec::new(),
        }
    }
}

// ── Subject ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubjectRecord {
    pub name: String,
    pub document_id: String, // masked CPF as shown by the portal
    pub locality: String,
    pub evidence_ref: Option<String>,
    pub source_url: String,
    pub benefits: Vec<BenefitCard>,
}

// ── Output document ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub query: Option<String>,
    pub generated_at: NaiveDateTime,
    pub subjects: Vec<SubjectRecord>,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
