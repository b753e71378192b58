//! Reduction of a multi-row lookup response to one annotated row.
//!
//! A symbol lookup may return several rows: one per GO term of the gene,
//! and sometimes rows for other genes whose symbol or synonyms matched
//! the query. [`reconcile`] decides which rows count for a gene under the
//! active [`Policy`] and collapses every tracked field to a single string.
//! Ambiguities are reported back as [`DiagnosticWrite`] requests and
//! warnings; nothing here touches the filesystem.

use hashbrown::HashSet;

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use config::{
    check_choice, sanitize_file_name, CliError, MULTIPLE_GENE_MATCHES, MULTIPLE_VALUES,
    STRICT_SUFFIX, TABLE_EXTENSION, VALUE_SEPARATOR,
};
use gene_lookup::{Field, LookupResponse, ANNOTATION_FIELDS, GO_FIELDS, IDENTIFIER_FIELDS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// GO terms from every returned row
    #[default]
    All,
    /// GO terms only from rows matching the queried symbol
    Strict,
}

impl Policy {
    pub const OPTIONS: [&'static str; 2] = ["all", "strict"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::All => "all",
            Policy::Strict => "strict",
        }
    }

    /// appended to the annotated table name
    pub fn suffix(&self) -> &'static str {
        match self {
            Policy::All => "",
            Policy::Strict => STRICT_SUFFIX,
        }
    }
}

impl FromStr for Policy {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        check_choice(s, &Self::OPTIONS, "--policy")?;
        match s {
            "strict" => Ok(Policy::Strict),
            _ => Ok(Policy::All),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One value per annotation column, empty when nothing was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    values: Vec<(Field, String)>,
}

impl Default for Annotation {
    fn default() -> Self {
        Self {
            values: ANNOTATION_FIELDS
                .iter()
                .map(|field| (*field, String::new()))
                .collect(),
        }
    }
}

impl Annotation {
    pub fn get(&self, field: Field) -> &str {
        self.values
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        self.values.iter().map(|(f, v)| (*f, v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|(_, v)| v.is_empty())
    }

    fn set(&mut self, field: Field, value: String) {
        if let Some(slot) = self.values.iter_mut().find(|(f, _)| *f == field) {
            slot.1 = value;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    MultipleGeneMatches,
    MultipleValues,
}

impl DiagnosticKind {
    pub fn folder(&self) -> &'static str {
        match self {
            DiagnosticKind::MultipleGeneMatches => MULTIPLE_GENE_MATCHES,
            DiagnosticKind::MultipleValues => MULTIPLE_VALUES,
        }
    }
}

/// A raw response the caller should persist for later inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticWrite {
    pub kind: DiagnosticKind,
    pub gene: String,
    pub payload: LookupResponse,
}

impl DiagnosticWrite {
    /// `<outdir>/<kind folder>/<gene>.txt`
    pub fn path<P: AsRef<Path>>(&self, outdir: P) -> PathBuf {
        outdir.as_ref().join(self.kind.folder()).join(format!(
            "{}.{}",
            sanitize_file_name(&self.gene),
            TABLE_EXTENSION
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    /// nothing was returned for the gene
    #[default]
    Empty,
    /// the gene was not among several matched symbols
    Skipped,
    Annotated,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Empty => "empty",
            Outcome::Skipped => "skipped",
            Outcome::Annotated => "annotated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reconciliation {
    pub gene: String,
    pub annotation: Annotation,
    pub writes: Vec<DiagnosticWrite>,
    pub warnings: Vec<String>,
    pub outcome: Outcome,
    pub rows: usize,
    pub symbols: Vec<String>,
    pub ambiguous_fields: Vec<Field>,
}

impl Reconciliation {
    fn new(gene: &str, rows: usize) -> Self {
        Self {
            gene: gene.to_string(),
            rows,
            ..Default::default()
        }
    }

    fn request(&mut self, kind: DiagnosticKind, payload: LookupResponse) {
        self.writes.push(DiagnosticWrite {
            kind,
            gene: self.gene.clone(),
            payload,
        });
    }

    pub fn has_multiple_matches(&self) -> bool {
        self.symbols.len() > 1
    }

    pub fn has_multiple_values(&self) -> bool {
        !self.ambiguous_fields.is_empty()
    }
}

/// distinct non-missing values in first-seen order
pub fn distinct<'a, I>(values: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .flatten()
        .filter(|value| seen.insert(*value))
        .collect()
}

/// collapse distinct values: none -> "", one -> itself, many -> joined by ';'
#[inline(always)]
pub fn reduce(values: &[&str]) -> String {
    values.join(VALUE_SEPARATOR)
}

/// Reconcile the lookup rows of `gene` under `policy`.
///
/// Under [`Policy::All`] GO terms come from every row and identifier
/// fields from the rows whose symbol is exactly `gene`; under
/// [`Policy::Strict`] both come from the exact matches. Filtering only
/// happens when the rows carry more than one distinct symbol.
pub fn reconcile(gene: &str, response: &LookupResponse, policy: Policy) -> Reconciliation {
    let mut reconciliation = Reconciliation::new(gene, response.len());
    if response.is_empty() {
        return reconciliation;
    }

    let symbols = distinct(response.values(Field::Symbol));
    let ambiguous = symbols.len() > 1;
    let matched = symbols.contains(&gene);

    if ambiguous {
        reconciliation.warnings.push(format!(
            "{}: multiple gene matches found [{}]",
            gene,
            symbols.join(", ")
        ));
        reconciliation.request(DiagnosticKind::MultipleGeneMatches, response.clone());
    }
    reconciliation.symbols = symbols.iter().map(|s| s.to_string()).collect();

    let mut skip = false;
    let go_view = match policy {
        Policy::Strict if ambiguous => {
            skip = !matched;
            Cow::Owned(response.filter_symbol(gene))
        }
        _ => Cow::Borrowed(response),
    };

    for field in GO_FIELDS {
        let values = distinct(go_view.values(field));
        reconciliation.annotation.set(field, reduce(&values));
    }

    let id_view = match policy {
        Policy::All if ambiguous => {
            skip = !matched;
            Cow::Owned(response.filter_symbol(gene))
        }
        _ => go_view,
    };

    if skip {
        reconciliation.warnings.push(format!(
            "{}: not among the matched symbols, identifier fields left empty",
            gene
        ));
        reconciliation.outcome = Outcome::Skipped;
        return reconciliation;
    }

    for field in IDENTIFIER_FIELDS {
        let values = distinct(id_view.values(field));
        if values.len() > 1 {
            reconciliation.warnings.push(format!(
                "{}: multiple values for {} [{}]",
                gene,
                field,
                values.join(", ")
            ));
            reconciliation.ambiguous_fields.push(field);
        }
        reconciliation.annotation.set(field, reduce(&values));
    }

    if reconciliation.has_multiple_values() {
        reconciliation.request(DiagnosticKind::MultipleValues, id_view.into_owned());
    }

    reconciliation.outcome = Outcome::Annotated;
    reconciliation
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(header: &[&str], rows: &[&[&str]]) -> LookupResponse {
        LookupResponse::new(
            header.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| {
                            if cell.is_empty() {
                                None
                            } else {
                                Some(cell.to_string())
                            }
                        })
                        .collect()
                })
                .collect(),
        )
    }

    fn full_header() -> Vec<&'static str> {
        std::iter::once(Field::Symbol)
            .chain(ANNOTATION_FIELDS)
            .map(|f| f.name())
            .collect()
    }

    fn ambiguous() -> LookupResponse {
        response(
            &["Symbol", "Gene_ID", "Gene_Type", "GOBP_ID"],
            &[
                &["XYZ1", "101", "PROTEIN_CODING", "GO:0001"],
                &["XYZ2", "202", "PSEUDO", "GO:0002"],
                &["XYZ1", "101", "PROTEIN_CODING", "GO:0003"],
            ],
        )
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("all".parse::<Policy>().unwrap(), Policy::All);
        assert_eq!("strict".parse::<Policy>().unwrap(), Policy::Strict);

        let err = "loose".parse::<Policy>().unwrap_err().to_string();
        assert!(err.contains("loose"));
        assert!(err.contains("all, strict"));
    }

    #[test]
    fn test_empty_response_yields_empty_annotation() {
        for policy in [Policy::All, Policy::Strict] {
            let rec = reconcile("WIPI2", &LookupResponse::default(), policy);

            assert!(rec.annotation.is_empty());
            assert_eq!(rec.annotation.iter().count(), 13);
            assert!(rec.writes.is_empty());
            assert!(rec.warnings.is_empty());
            assert_eq!(rec.outcome, Outcome::Empty);
        }
    }

    #[test]
    fn test_single_complete_row_is_copied_verbatim() {
        let header = full_header();
        let row = [
            "WIPI2",
            "26100",
            "ATG18B,CGI-50",
            "WD repeat domain, phosphoinositide interacting 2",
            "PROTEIN_CODING",
            "plus",
            "12",
            "9",
            "GO:0000045",
            "autophagosome assembly",
            "GO:0005829",
            "cytosol",
            "GO:0080025",
            "phosphatidylinositol-3,5-bisphosphate binding",
        ];
        let single = response(&header, &[&row]);

        for policy in [Policy::All, Policy::Strict] {
            let rec = reconcile("WIPI2", &single, policy);

            for (idx, field) in ANNOTATION_FIELDS.iter().enumerate() {
                assert_eq!(rec.annotation.get(*field), row[idx + 1]);
            }
            assert!(rec.writes.is_empty());
            assert_eq!(rec.outcome, Outcome::Annotated);
        }
    }

    #[test]
    fn test_go_terms_are_joined_in_first_seen_order() {
        let wipi2 = response(
            &["Symbol", "Gene_ID", "GOBP_ID"],
            &[
                &["WIPI2", "26100", "GO:001"],
                &["WIPI2", "26100", "GO:002"],
                &["WIPI2", "26100", "GO:001"],
            ],
        );

        let rec = reconcile("WIPI2", &wipi2, Policy::All);

        assert_eq!(rec.annotation.get(Field::GobpId), "GO:001;GO:002");
        assert_eq!(rec.annotation.get(Field::GeneId), "26100");
        assert!(rec.writes.is_empty());
    }

    #[test]
    fn test_missing_identifier_reduces_to_empty() {
        let abc = LookupResponse::from_tsv("Symbol\tGene_ID\nABC\tNaN\n").unwrap();

        for policy in [Policy::All, Policy::Strict] {
            let rec = reconcile("ABC", &abc, policy);
            assert_eq!(rec.annotation.get(Field::GeneId), "");
            assert!(!rec.has_multiple_values());
        }
    }

    #[test]
    fn test_multiple_symbols_request_one_full_diagnostic() {
        let raw = ambiguous();

        for policy in [Policy::All, Policy::Strict] {
            let rec = reconcile("XYZ1", &raw, policy);

            let matches = rec
                .writes
                .iter()
                .filter(|w| w.kind == DiagnosticKind::MultipleGeneMatches)
                .collect::<Vec<_>>();

            assert_eq!(matches.len(), 1);
            assert_eq!(matches[0].payload, raw);
            assert_eq!(rec.symbols, vec!["XYZ1", "XYZ2"]);
            assert!(rec.warnings[0].contains("XYZ1, XYZ2"));
        }
    }

    #[test]
    fn test_strict_filters_before_go_terms() {
        let rec = reconcile("XYZ1", &ambiguous(), Policy::Strict);

        assert_eq!(rec.outcome, Outcome::Annotated);
        assert_eq!(rec.annotation.get(Field::GeneId), "101");
        assert_eq!(rec.annotation.get(Field::GeneType), "PROTEIN_CODING");
        assert_eq!(rec.annotation.get(Field::GobpId), "GO:0001;GO:0003");
        assert!(!rec.has_multiple_values());
    }

    #[test]
    fn test_all_filters_after_go_terms() {
        let rec = reconcile("XYZ1", &ambiguous(), Policy::All);

        assert_eq!(rec.outcome, Outcome::Annotated);
        assert_eq!(rec.annotation.get(Field::GeneId), "101");
        assert_eq!(rec.annotation.get(Field::GobpId), "GO:0001;GO:0002;GO:0003");
    }

    #[test]
    fn test_strict_skips_absent_symbol() {
        let rec = reconcile("XYZ", &ambiguous(), Policy::Strict);

        assert_eq!(rec.outcome, Outcome::Skipped);
        assert!(rec.annotation.is_empty());
        assert_eq!(rec.writes.len(), 1);
        assert_eq!(rec.writes[0].kind, DiagnosticKind::MultipleGeneMatches);
    }

    #[test]
    fn test_all_skips_identifiers_but_keeps_go_terms() {
        let rec = reconcile("XYZ", &ambiguous(), Policy::All);

        assert_eq!(rec.outcome, Outcome::Skipped);
        for field in IDENTIFIER_FIELDS {
            assert_eq!(rec.annotation.get(field), "");
        }
        assert_eq!(rec.annotation.get(Field::GobpId), "GO:0001;GO:0002;GO:0003");
    }

    #[test]
    fn test_single_symbol_is_never_filtered() {
        // an alias query answered with the official symbol
        let raw = response(&["Symbol", "Gene_ID"], &[&["WIPI2", "26100"]]);

        for policy in [Policy::All, Policy::Strict] {
            let rec = reconcile("ATG18B", &raw, policy);
            assert_eq!(rec.outcome, Outcome::Annotated);
            assert_eq!(rec.annotation.get(Field::GeneId), "26100");
        }
    }

    #[test]
    fn test_multiple_values_request_filtered_view_once() {
        let raw = response(
            &["Symbol", "Gene_ID", "Description", "Transcripts"],
            &[
                &["TTN", "7273", "titin", "20"],
                &["TTN", "7273", "titin isoform", "21"],
                &["TTN-AS1", "100506866", "antisense", "3"],
            ],
        );

        let rec = reconcile("TTN", &raw, Policy::All);

        assert_eq!(rec.annotation.get(Field::Description), "titin;titin isoform");
        assert_eq!(rec.annotation.get(Field::Transcripts), "20;21");
        assert_eq!(rec.ambiguous_fields, vec![Field::Description, Field::Transcripts]);

        let values = rec
            .writes
            .iter()
            .filter(|w| w.kind == DiagnosticKind::MultipleValues)
            .collect::<Vec<_>>();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].payload, raw.filter_symbol("TTN"));

        let warning = rec
            .warnings
            .iter()
            .find(|w| w.contains("Description"))
            .unwrap();
        assert!(warning.contains("TTN"));
        assert!(warning.contains("titin, titin isoform"));
    }

    #[test]
    fn test_rows_without_symbol_never_match() {
        let raw = response(
            &["Symbol", "Gene_ID", "GOBP_ID"],
            &[
                &["XYZ1", "101", "GO:0001"],
                &["", "303", "GO:0009"],
                &["XYZ2", "202", "GO:0002"],
            ],
        );

        let strict = reconcile("XYZ1", &raw, Policy::Strict);
        assert_eq!(strict.symbols, vec!["XYZ1", "XYZ2"]);
        assert_eq!(strict.outcome, Outcome::Annotated);
        assert_eq!(strict.annotation.get(Field::GeneId), "101");
        assert_eq!(strict.annotation.get(Field::GobpId), "GO:0001");

        let all = reconcile("XYZ1", &raw, Policy::All);
        assert_eq!(all.symbols, vec!["XYZ1", "XYZ2"]);
        assert_eq!(all.annotation.get(Field::GeneId), "101");
        assert_eq!(all.annotation.get(Field::GobpId), "GO:0001;GO:0009;GO:0002");
        assert!(!all.has_multiple_values());

        // one real symbol plus blanks is not ambiguous, nothing is filtered
        let single = response(
            &["Symbol", "Gene_ID"],
            &[&["XYZ1", "101"], &["", "303"]],
        );
        for policy in [Policy::All, Policy::Strict] {
            let rec = reconcile("XYZ1", &single, policy);
            assert!(!rec.has_multiple_matches());
            assert_eq!(rec.annotation.get(Field::GeneId), "101;303");
        }
    }

    #[test]
    fn test_response_without_symbol_column_is_not_filtered() {
        let raw = response(
            &["Gene_ID", "GOBP_ID"],
            &[&["1", "GO:0001"], &["2", "GO:0002"]],
        );

        for policy in [Policy::All, Policy::Strict] {
            let rec = reconcile("WIPI2", &raw, policy);

            assert_eq!(rec.outcome, Outcome::Annotated);
            assert!(rec.symbols.is_empty());
            assert_eq!(rec.annotation.get(Field::GeneId), "1;2");
            assert_eq!(rec.annotation.get(Field::GobpId), "GO:0001;GO:0002");
            assert_eq!(rec.writes.len(), 1);
            assert_eq!(rec.writes[0].kind, DiagnosticKind::MultipleValues);
        }
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let raw = ambiguous();
        assert_eq!(
            reconcile("XYZ1", &raw, Policy::All),
            reconcile("XYZ1", &raw, Policy::All)
        );
        assert_eq!(
            reconcile("XYZ", &raw, Policy::Strict),
            reconcile("XYZ", &raw, Policy::Strict)
        );
    }

    #[test]
    fn test_diagnostic_path() {
        let write = DiagnosticWrite {
            kind: DiagnosticKind::MultipleValues,
            gene: "HLA-A".to_string(),
            payload: LookupResponse::default(),
        };

        assert_eq!(
            write.path("/tmp/run"),
            PathBuf::from("/tmp/run/multiple-values/HLA-A.txt")
        );
    }
}
