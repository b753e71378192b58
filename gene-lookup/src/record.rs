use std::fmt;
use std::path::Path;

use config::{is_missing, write_table, CliError, Delimiter};

/// Columns requested from `dataformat tsv gene`.
///
/// Each field knows its short column name (used in annotated tables), the
/// header `dataformat` prints for it, and the `--fields` flag that
/// requests it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Symbol,
    GeneId,
    Synonyms,
    Description,
    EnsemblIds,
    GeneType,
    GobpId,
    GobpName,
    GoccId,
    GoccName,
    GomfId,
    GomfName,
    NameId,
    Orientation,
    Transcripts,
    Proteins,
}

pub const REQUESTED_FIELDS: [Field; 16] = [
    Field::Symbol,
    Field::GeneId,
    Field::Synonyms,
    Field::Description,
    Field::EnsemblIds,
    Field::GeneType,
    Field::GobpId,
    Field::GobpName,
    Field::GoccId,
    Field::GoccName,
    Field::GomfId,
    Field::GomfName,
    Field::NameId,
    Field::Orientation,
    Field::Transcripts,
    Field::Proteins,
];

pub const IDENTIFIER_FIELDS: [Field; 7] = [
    Field::GeneId,
    Field::Synonyms,
    Field::Description,
    Field::GeneType,
    Field::Orientation,
    Field::Transcripts,
    Field::Proteins,
];

pub const GO_FIELDS: [Field; 6] = [
    Field::GobpId,
    Field::GobpName,
    Field::GoccId,
    Field::GoccName,
    Field::GomfId,
    Field::GomfName,
];

/// identifier columns first, then GO columns
pub const ANNOTATION_FIELDS: [Field; 13] = [
    Field::GeneId,
    Field::Synonyms,
    Field::Description,
    Field::GeneType,
    Field::Orientation,
    Field::Transcripts,
    Field::Proteins,
    Field::GobpId,
    Field::GobpName,
    Field::GoccId,
    Field::GoccName,
    Field::GomfId,
    Field::GomfName,
];

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Symbol => "Symbol",
            Field::GeneId => "Gene_ID",
            Field::Synonyms => "Synonyms",
            Field::Description => "Description",
            Field::EnsemblIds => "Ensembl_GeneIDs",
            Field::GeneType => "Gene_Type",
            Field::GobpId => "GOBP_ID",
            Field::GobpName => "GOBP_Name",
            Field::GoccId => "GOCC_ID",
            Field::GoccName => "GOCC_Name",
            Field::GomfId => "GOMF_ID",
            Field::GomfName => "GOMF_Name",
            Field::NameId => "Name_ID",
            Field::Orientation => "Orientation",
            Field::Transcripts => "Transcripts",
            Field::Proteins => "Proteins",
        }
    }

    pub fn header(&self) -> &'static str {
        match self {
            Field::Symbol => "Symbol",
            Field::GeneId => "NCBI GeneID",
            Field::Synonyms => "Synonyms",
            Field::Description => "Description",
            Field::EnsemblIds => "Ensembl GeneIDs",
            Field::GeneType => "Gene Type",
            Field::GobpId => "Gene Ontology Process ID",
            Field::GobpName => "Gene Ontology Process Name",
            Field::GoccId => "Gene Ontology Component ID",
            Field::GoccName => "Gene Ontology Component Name",
            Field::GomfId => "Gene Ontology Function ID",
            Field::GomfName => "Gene Ontology Function Name",
            Field::NameId => "Nomenclature ID",
            Field::Orientation => "Orientation",
            Field::Transcripts => "Transcript Count",
            Field::Proteins => "Protein Count",
        }
    }

    pub fn flag(&self) -> &'static str {
        match self {
            Field::Symbol => "symbol",
            Field::GeneId => "gene-id",
            Field::Synonyms => "synonyms",
            Field::Description => "description",
            Field::EnsemblIds => "ensembl-geneids",
            Field::GeneType => "gene-type",
            Field::GobpId => "go-bp-id",
            Field::GobpName => "go-bp-name",
            Field::GoccId => "go-cc-id",
            Field::GoccName => "go-cc-name",
            Field::GomfId => "go-mf-id",
            Field::GomfName => "go-mf-name",
            Field::NameId => "name-id",
            Field::Orientation => "orientation",
            Field::Transcripts => "transcript-count",
            Field::Proteins => "protein-count",
        }
    }

    #[inline(always)]
    fn matches(&self, column: &str) -> bool {
        let column = column.trim();
        column == self.name() || column == self.header()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// comma-joined value for `dataformat --fields`
pub fn fields_arg() -> String {
    REQUESTED_FIELDS
        .iter()
        .map(|field| field.flag())
        .collect::<Vec<_>>()
        .join(",")
}

/// Raw rows returned for a single query.
///
/// The header is kept as received so the response can be written back
/// out verbatim; missing cells are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LookupResponse {
    header: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl LookupResponse {
    pub fn new(header: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        let width = header.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();

        Self { header, rows }
    }

    pub fn from_tsv(text: &str) -> Result<Self, csv::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let header = reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row = record
                .iter()
                .map(|cell| {
                    if is_missing(cell) {
                        None
                    } else {
                        Some(cell.to_string())
                    }
                })
                .collect::<Vec<_>>();

            // rows without a single value have nothing to reconcile
            if row.iter().all(Option::is_none) {
                continue;
            }
            rows.push(row);
        }

        Ok(Self::new(header, rows))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// index of the column holding `field`, by short name or tool header
    pub fn column(&self, field: Field) -> Option<usize> {
        self.header.iter().position(|h| field.matches(h))
    }

    /// the cells of `field`, one per row; all `None` if the column is absent
    pub fn values(&self, field: Field) -> impl Iterator<Item = Option<&str>> + '_ {
        let column = self.column(field);
        self.rows
            .iter()
            .map(move |row| column.and_then(|idx| row[idx].as_deref()))
    }

    /// rows whose symbol equals `symbol` exactly
    pub fn filter_symbol(&self, symbol: &str) -> Self {
        let rows = match self.column(Field::Symbol) {
            Some(idx) => self
                .rows
                .iter()
                .filter(|row| row[idx].as_deref() == Some(symbol))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        Self {
            header: self.header.clone(),
            rows,
        }
    }

    /// append the rows of `other`, lining columns up by header name
    pub fn extend(&mut self, other: LookupResponse) {
        if self.header.is_empty() {
            *self = other;
            return;
        }

        let positions = other
            .header
            .iter()
            .map(|name| match self.header.iter().position(|h| h == name) {
                Some(idx) => idx,
                None => {
                    self.header.push(name.clone());
                    self.header.len() - 1
                }
            })
            .collect::<Vec<_>>();

        let width = self.header.len();
        for row in self.rows.iter_mut() {
            row.resize(width, None);
        }

        for row in other.rows {
            let mut aligned = vec![None; width];
            for (cell, idx) in row.into_iter().zip(positions.iter()) {
                aligned[*idx] = cell;
            }
            self.rows.push(aligned);
        }
    }

    /// write the response as received; missing cells become empty
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<usize, CliError> {
        write_table(
            path,
            Delimiter::Tab,
            &self.header,
            self.rows
                .iter()
                .map(|row| row.iter().map(|cell| cell.as_deref().unwrap_or(""))),
        )
    }
}
