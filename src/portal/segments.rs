//! Segment registry: one schema entry per benefit segment.
//!
//! Both extraction paths (structured endpoint and rendered table) consume the
//! same [`SegmentSchema`], so a segment's record shape is defined exactly once.

use serde::{Serialize, Serializer};
use std::fmt;

// ── Segment ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    EmergencyAid,
    BrazilAid,
    FamilyAllowance,
    NewFamilyAllowance,
    HarvestAid,
    /// Slug the registry has no entry for.
    Unknown(String),
}

impl Segment {
    pub const KNOWN: [Segment; 5] = [
        Segment::EmergencyAid,
        Segment::BrazilAid,
        Segment::FamilyAllowance,
        Segment::NewFamilyAllowance,
        Segment::HarvestAid,
    ];

    /// Map a portal URL slug ("bolsa-familia") to a segment.
    pub fn from_slug(slug: &str) -> Self {
        match slug.trim() {
            "auxilio-emergencial" => Segment::EmergencyAid,
            "auxilio-brasil" => Segment::BrazilAid,
            "bolsa-familia" => Segment::FamilyAllowance,
            "novo-bolsa-familia" => Segment::NewFamilyAllowance,
            "safra" => Segment::HarvestAid,
            other => Segment::Unknown(other.to_string()),
        }
    }

    pub fn slug(&self) -> &str {
        match self {
            Segment::EmergencyAid => "auxilio-emergencial",
            Segment::BrazilAid => "auxilio-brasil",
            Segment::FamilyAllowance => "bolsa-familia",
            Segment::NewFamilyAllowance => "novo-bolsa-familia",
            Segment::HarvestAid => "safra",
            Segment::Unknown(slug) => slug,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Segment::Unknown(_))
    }

    pub fn schema(&self) -> &'static SegmentSchema {
        schema_for(self)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl Serialize for Segment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.slug())
    }
}

// ── Schema ────────────────────────────────────────────────────────────────────

/// One column: the endpoint's JSON key and the normalised output field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMap {
    pub source: &'static str,
    pub output: &'static str,
}

const fn field(source: &'static str, output: &'static str) -> FieldMap {
    FieldMap { source, output }
}

#[derive(Debug, PartialEq, Eq)]
pub struct SegmentSchema {
    /// Suffix after `/beneficios/<slug>/`.
    pub endpoint_path: &'static str,
    /// Query parameter carrying the benefit instance id.
    pub id_param: &'static str,
    /// Column the endpoint sorts on, descending.
    pub sort_column: &'static str,
    /// Ordered columns. Rendered-table cell `i` maps to `fields[i]`.
    pub fields: &'static [FieldMap],
}

impl SegmentSchema {
    pub fn output_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.output)
    }

    /// Comma-joined source columns, as the endpoint's `colunasSelecionadas`.
    pub fn selected_columns(&self) -> String {
        self.fields
            .iter()
            .map(|f| f.source)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Fewest `td` cells a rendered row needs to be mapped.
    pub fn min_columns(&self) -> usize {
        self.fields.len()
    }
}

static EMERGENCY_AID: SegmentSchema = SegmentSchema {
    endpoint_path: "recebido/resultado",
    id_param: "skBeneficiario",
    sort_column: "numeroParcela",
    fields: &[
        field("mesDisponibilizacao", "mes_disponibilizacao"),
        field("numeroParcela", "parcela"),
        field("uf", "uf"),
        field("municipio", "municipio"),
        field("enquadramento", "enquadramento"),
        field("valor", "valor"),
        field("observacao", "observacao"),
    ],
};

static BRAZIL_AID: SegmentSchema = SegmentSchema {
    endpoint_path: "sacado/resultado",
    id_param: "beneficiario",
    sort_column: "mesReferencia",
    fields: &[
        field("mesFolha", "mes_folha"),
        field("mesReferencia", "mes_ref"),
        field("uf", "uf"),
        field("municipio", "municipio"),
        field("valor", "valor"),
    ],
};

static FAMILY_ALLOWANCE: SegmentSchema = SegmentSchema {
    endpoint_path: "sacado/resultado",
    id_param: "beneficiario",
    sort_column: "mesReferencia",
    fields: &[
        field("mesFolha", "mes_folha"),
        field("mesReferencia", "mes_ref"),
        field("uf", "uf"),
        field("municipio", "municipio"),
        field("quantidadeDependentes", "qtd_dependentes"),
        field("valor", "valor"),
    ],
};

static NEW_FAMILY_ALLOWANCE: SegmentSchema = SegmentSchema {
    endpoint_path: "sacado/resultado",
    id_param: "beneficiario",
    sort_column: "mesReferencia",
    fields: &[
        field("mesFolha", "mes_folha"),
        field("mesReferencia", "mes_ref"),
        field("uf", "uf"),
        field("municipio", "municipio"),
        field("valor", "valor"),
    ],
};

// Sorted on mesReferencia even though the column is not selected; the
// endpoint accepts it.
static HARVEST_AID: SegmentSchema = SegmentSchema {
    endpoint_path: "recebido/resultado",
    id_param: "skBeneficiario",
    sort_column: "mesReferencia",
    fields: &[
        field("mesFolha", "mes_folha"),
        field("uf", "uf"),
        field("municipio", "municipio"),
        field("valor", "valor"),
    ],
};

/// Last-resort schema for segments the registry does not know.
pub static DEGENERATE: SegmentSchema = SegmentSchema {
    endpoint_path: "sacado/resultado",
    id_param: "beneficiario",
    sort_column: "mesReferencia",
    fields: &[field("mesReferencia", "mes_ref"), field("valor", "valor")],
};

// ── Lookups ───────────────────────────────────────────────────────────────────

pub fn schema_for(segment: &Segment) -> &'static SegmentSchema {
    match segment {
        Segment::EmergencyAid => &EMERGENCY_AID,
        Segment::BrazilAid => &BRAZIL_AID,
        Segment::FamilyAllowance => &FAMILY_ALLOWANCE,
        Segment::NewFamilyAllowance => &NEW_FAMILY_ALLOWANCE,
        Segment::HarvestAid => &HARVEST_AID,
        Segment::Unknown(_) => &DEGENERATE,
    }
}

pub fn endpoint_path_for(segment: &Segment) -> &'static str {
    schema_for(segment).endpoint_path
}

pub fn sort_column_for(segment: &Segment) -> &'static str {
    schema_for(segment).sort_column
}

pub fn id_param_for(segment: &Segment) -> &'static str {
    schema_for(segment).id_param
}

pub fn field_names(segment: &Segment) -> Vec<&'static str> {
    schema_for(segment).output_fields().collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
