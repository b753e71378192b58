use serde::Serialize;

use std::path::{Path, PathBuf};

use config::{
    create_folder, sanitize_file_name, write_table, CliError, Delimiter, ANNOTATE_SUFFIX,
    DESCRIPTOR_SUFFIX, RAW_RESPONSES, TABLE_EXTENSION,
};
use gene_lookup::{Field, LookupResponse};

use crate::reconcile::{Annotation, DiagnosticWrite, Policy, Reconciliation};

/// The gene table being annotated.
///
/// Cells are kept as read; only the annotation columns are touched.
#[derive(Debug, Clone)]
pub struct Worklist {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    key: usize,
    delimiter: Delimiter,
}

impl Worklist {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        column: &str,
        delimiter: Delimiter,
    ) -> Result<Self, CliError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter.as_byte())
            .has_headers(true)
            .flexible(true)
            .from_path(path.as_ref())?;

        let mut header = reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>();

        let key = header
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| CliError::MissingColumn {
                column: column.to_string(),
                path: path.as_ref().to_path_buf(),
            })?;

        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?.iter().map(|c| c.to_string()).collect::<Vec<_>>());
        }

        // unnamed trailing cells keep their place, new columns go after them
        let width = rows.iter().map(|r| r.len()).fold(header.len(), usize::max);
        header.resize(width, String::new());
        rows.iter_mut().for_each(|r| r.resize(width, String::new()));

        log::info!("Genes in {:?}: {}", path.as_ref(), rows.len());

        Ok(Self {
            header,
            rows,
            key,
            delimiter,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// the lookup key of `row`, `None` for blank cells
    pub fn symbol(&self, row: usize) -> Option<&str> {
        self.rows
            .get(row)
            .map(|r| r[self.key].trim())
            .filter(|s| !s.is_empty())
    }

    /// make sure every field has a column, existing columns are reused
    pub fn prepare(&mut self, fields: &[Field]) {
        for field in fields {
            self.column_of(*field);
        }
    }

    pub fn get(&self, row: usize, field: Field) -> Option<&str> {
        let column = self.header.iter().position(|h| h == field.name())?;
        self.rows.get(row).map(|r| r[column].as_str())
    }

    /// write the annotation values into `row`
    pub fn merge(&mut self, row: usize, annotation: &Annotation) {
        for (field, value) in annotation.iter() {
            let column = self.column_of(field);
            if let Some(cells) = self.rows.get_mut(row) {
                cells[column] = value.to_string();
            }
        }
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<usize, CliError> {
        write_table(path, self.delimiter, &self.header, self.rows.iter())
    }

    fn column_of(&mut self, field: Field) -> usize {
        match self.header.iter().position(|h| h == field.name()) {
            Some(idx) => idx,
            None => {
                self.header.push(field.name().to_string());
                let width = self.header.len();
                for row in self.rows.iter_mut() {
                    row.resize(width, String::new());
                }
                width - 1
            }
        }
    }
}

/// `<outdir>/<stem>_annotate[_strict].<ext>`, `<ext>` being the input's own
pub fn output_path<P: AsRef<Path>>(input: P, outdir: P, policy: Policy) -> PathBuf {
    let input = input.as_ref();
    let mut name = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "genes".into());
    name.push(ANNOTATE_SUFFIX);
    name.push(policy.suffix());

    if let Some(ext) = input.extension() {
        name.push(".");
        name.push(ext);
    }

    outdir.as_ref().join(name)
}

/// `<outdir>/<stem>_descriptor.txt`
pub fn descriptor_path<P: AsRef<Path>>(input: P, outdir: P) -> PathBuf {
    let stem = input
        .as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "genes".to_string());

    outdir
        .as_ref()
        .join(format!("{}{}.{}", stem, DESCRIPTOR_SUFFIX, TABLE_EXTENSION))
}

/// persist every diagnostic request, returns how many failed
pub fn apply_writes<P: AsRef<Path>>(writes: &[DiagnosticWrite], outdir: P) -> usize {
    let mut failed = 0;
    for write in writes {
        let result = create_folder(outdir.as_ref(), write.kind.folder())
            .and_then(|_| write.payload.write(write.path(outdir.as_ref())));

        if let Err(e) = result {
            log::error!(
                "{}: could not write {} diagnostics: {}",
                write.gene,
                write.kind.folder(),
                e
            );
            failed += 1;
        }
    }

    failed
}

/// `<outdir>/raw-responses/<gene>.txt`
pub fn save_raw<P: AsRef<Path>>(
    gene: &str,
    response: &LookupResponse,
    outdir: P,
) -> Result<PathBuf, CliError> {
    let folder = create_folder(outdir, RAW_RESPONSES)?;
    let path = folder.join(format!("{}.{}", sanitize_file_name(gene), TABLE_EXTENSION));
    response.write(&path)?;
    Ok(path)
}

/// One line of the per-gene descriptor table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptorEntry {
    #[serde(rename = "Gene")]
    pub gene: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Rows")]
    pub rows: usize,
    #[serde(rename = "Symbols")]
    pub symbols: String,
    #[serde(rename = "Ambiguous_Fields")]
    pub ambiguous_fields: String,
}

impl DescriptorEntry {
    pub fn new(reconciliation: &Reconciliation, lookup_failed: bool) -> Self {
        let status = if lookup_failed {
            "failed"
        } else {
            reconciliation.outcome.as_str()
        };

        let fields = reconciliation
            .ambiguous_fields
            .iter()
            .map(|f| f.name())
            .collect::<Vec<_>>();

        Self {
            gene: reconciliation.gene.clone(),
            status: status.to_string(),
            rows: reconciliation.rows,
            symbols: serde_json::to_string(&reconciliation.symbols).unwrap_or_default(),
            ambiguous_fields: serde_json::to_string(&fields).unwrap_or_default(),
        }
    }
}

pub fn write_descriptor<P: AsRef<Path>>(
    entries: &[DescriptorEntry],
    path: P,
) -> Result<(), CliError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_path(path.as_ref())?;

    for entry in entries {
        writer.serialize(entry)?;
    }
    writer.flush()?;

    log::info!("Genes in {:?}: {}", path.as_ref(), entries.len());
    Ok(())
}
