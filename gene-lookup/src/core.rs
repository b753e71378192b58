use anyhow::Result;
use hashbrown::HashSet;
use log::{error, info, warn};
use thiserror::Error;

use std::fmt;
use std::fs::read_to_string;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::str::FromStr;
use std::thread;

use config::{check_choice, get_progress_bar, CliError, DATAFORMAT, DATASETS};

use crate::cli::Args;
use crate::record::{fields_arg, LookupResponse};

/// What the query value passed to `datasets summary gene` is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupType {
    #[default]
    Symbol,
    GeneId,
    Accession,
    Taxon,
}

impl LookupType {
    pub const OPTIONS: [&'static str; 4] = ["symbol", "gene-id", "accession", "taxon"];

    pub fn as_str(&self) -> &'static str {
        match self {
            LookupType::Symbol => "symbol",
            LookupType::GeneId => "gene-id",
            LookupType::Accession => "accession",
            LookupType::Taxon => "taxon",
        }
    }
}

impl FromStr for LookupType {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        check_choice(s, &Self::OPTIONS, "--lookup-type")?;
        match s {
            "gene-id" => Ok(LookupType::GeneId),
            "accession" => Ok(LookupType::Accession),
            "taxon" => Ok(LookupType::Taxon),
            _ => Ok(LookupType::Symbol),
        }
    }
}

impl fmt::Display for LookupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("ERROR: failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("ERROR: {tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("ERROR: could not parse lookup output: {0}")]
    Parse(#[from] csv::Error),
}

impl LookupError {
    fn spawn(tool: &Path, source: std::io::Error) -> Self {
        LookupError::Spawn {
            tool: tool.display().to_string(),
            source,
        }
    }

    fn failed(tool: &Path, status: ExitStatus, stderr: &[u8]) -> Self {
        LookupError::Failed {
            tool: tool.display().to_string(),
            status,
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }
}

/// A source of annotation rows for one query value.
pub trait GeneLookup {
    fn lookup(&self, query: &str) -> Result<LookupResponse, LookupError>;
}

/// `datasets summary gene ... --as-json-lines | dataformat tsv gene --fields ...`
#[derive(Debug, Clone)]
pub struct Datasets {
    datasets: PathBuf,
    dataformat: PathBuf,
    lookup_type: LookupType,
    taxon: String,
}

impl Datasets {
    pub fn new(lookup_type: LookupType, taxon: &str) -> Self {
        Self {
            datasets: PathBuf::from(DATASETS),
            dataformat: PathBuf::from(DATAFORMAT),
            lookup_type,
            taxon: taxon.to_string(),
        }
    }

    pub fn with_binaries<P: AsRef<Path>>(mut self, datasets: P, dataformat: P) -> Self {
        self.datasets = datasets.as_ref().to_path_buf();
        self.dataformat = dataformat.as_ref().to_path_buf();
        self
    }

    fn summary_args(&self, query: &str) -> Vec<String> {
        let mut args = vec![
            "summary".to_string(),
            "gene".to_string(),
            self.lookup_type.as_str().to_string(),
            query.to_string(),
        ];

        // only symbol lookups accept a taxon filter
        if self.lookup_type == LookupType::Symbol {
            args.push("--taxon".to_string());
            args.push(self.taxon.clone());
        }

        args.push("--as-json-lines".to_string());
        args
    }

    fn format_args() -> Vec<String> {
        vec![
            "tsv".to_string(),
            "gene".to_string(),
            "--fields".to_string(),
            fields_arg(),
        ]
    }
}

impl GeneLookup for Datasets {
    fn lookup(&self, query: &str) -> Result<LookupResponse, LookupError> {
        let mut summary = Command::new(&self.datasets)
            .args(self.summary_args(query))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LookupError::spawn(&self.datasets, e))?;

        // drained concurrently, a full stderr pipe would stall datasets
        let stderr = summary.stderr.take();
        let drain = thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_end(&mut buf);
            }
            buf
        });

        let pipe = match summary.stdout.take() {
            Some(pipe) => pipe,
            None => {
                let _ = summary.kill();
                let _ = summary.wait();
                let err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout not captured");
                return Err(LookupError::spawn(&self.datasets, err));
            }
        };

        let formatted = Command::new(&self.dataformat)
            .args(Self::format_args())
            .stdin(Stdio::from(pipe))
            .output();

        let formatted = match formatted {
            Ok(output) => output,
            Err(e) => {
                let _ = summary.kill();
                let _ = summary.wait();
                return Err(LookupError::spawn(&self.dataformat, e));
            }
        };

        let status = summary
            .wait()
            .map_err(|e| LookupError::spawn(&self.datasets, e))?;
        let summary_stderr = drain.join().unwrap_or_default();

        if !formatted.status.success() {
            if !status.success() {
                warn!(
                    "{} also exited with {}: {}",
                    self.datasets.display(),
                    status,
                    String::from_utf8_lossy(&summary_stderr).trim()
                );
            }
            return Err(LookupError::failed(
                &self.dataformat,
                formatted.status,
                &formatted.stderr,
            ));
        }

        if !status.success() {
            return Err(LookupError::failed(&self.datasets, status, &summary_stderr));
        }

        let text = String::from_utf8_lossy(&formatted.stdout);
        Ok(LookupResponse::from_tsv(&text)?)
    }
}

/// query every gene and write the concatenated raw rows to `args.output`
pub fn lookup_genes(args: Args) -> Result<usize> {
    let lookup = Datasets::new(args.lookup_type()?, &args.taxon)
        .with_binaries(&args.datasets, &args.dataformat);

    let genes = collect_genes(&args.genes, args.file.as_deref())?;
    info!("Looking up {} genes as {}", genes.len(), args.lookup_type);

    let pb = get_progress_bar(genes.len() as u64, "Looking up genes...");
    let mut table = LookupResponse::default();
    let mut failed = 0;

    for gene in genes.iter() {
        match lookup.lookup(gene) {
            Ok(response) if response.is_empty() => {
                warn!("{}: no records returned", gene);
            }
            Ok(response) => table.extend(response),
            Err(e) => {
                error!("{}: {}", gene, e);
                failed += 1;
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();

    if failed > 0 {
        warn!("Lookups failed: {} of {}", failed, genes.len());
    }

    let rows = table.write(&args.output)?;
    Ok(rows)
}

/// genes from the command line followed by genes from a file, first occurrence kept
pub fn collect_genes(genes: &[String], file: Option<&Path>) -> Result<Vec<String>, CliError> {
    let mut from_file = Vec::new();
    if let Some(path) = file {
        let contents = read_to_string(path)?;
        from_file.extend(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }

    let mut seen = HashSet::new();
    let collected = genes
        .iter()
        .map(|g| g.trim().to_string())
        .chain(from_file)
        .filter(|g| !g.is_empty())
        .filter(|g| seen.insert(g.clone()))
        .collect::<Vec<_>>();

    if collected.is_empty() {
        return Err(CliError::InvalidInput(
            "ERROR: No genes provided, use --genes and/or --file".to_string(),
        ));
    }

    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_lookup_type_from_str() {
        assert_eq!("symbol".parse::<LookupType>().unwrap(), LookupType::Symbol);
        assert_eq!("gene-id".parse::<LookupType>().unwrap(), LookupType::GeneId);
        assert_eq!(
            "accession".parse::<LookupType>().unwrap(),
            LookupType::Accession
        );

        let err = "name".parse::<LookupType>().unwrap_err().to_string();
        assert!(err.contains("symbol, gene-id, accession, taxon"));
    }

    #[test]
    fn test_summary_args() {
        let symbol = Datasets::new(LookupType::Symbol, "human");
        assert_eq!(
            symbol.summary_args("WIPI2"),
            vec![
                "summary",
                "gene",
                "symbol",
                "WIPI2",
                "--taxon",
                "human",
                "--as-json-lines"
            ]
        );

        let gene_id = Datasets::new(LookupType::GeneId, "human");
        assert_eq!(
            gene_id.summary_args("26100"),
            vec!["summary", "gene", "gene-id", "26100", "--as-json-lines"]
        );
    }

    #[test]
    fn test_collect_genes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# liver panel\nZG16B\n\nWIPI2\nKIAA1549L").unwrap();

        let genes = collect_genes(&["WIPI2".to_string()], Some(file.path())).unwrap();
        assert_eq!(genes, vec!["WIPI2", "ZG16B", "KIAA1549L"]);

        assert!(collect_genes(&[], None).is_err());
    }

    #[cfg(unix)]
    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        {
            let mut file = std::fs::File::create(&path).unwrap();
            write!(file, "#!/bin/sh\n{}\n", body).unwrap();
        }
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_datasets_pipeline_with_stub_tools() {
        let dir = tempfile::tempdir().unwrap();

        let datasets = script(dir.path(), "datasets", "echo '{\"symbol\": \"WIPI2\"}'");
        let dataformat = script(
            dir.path(),
            "dataformat",
            "cat > /dev/null\nprintf 'Symbol\\tNCBI GeneID\\nWIPI2\\t26100\\n'",
        );

        let lookup = Datasets::new(LookupType::Symbol, "human").with_binaries(&datasets, &dataformat);
        let response = lookup.lookup("WIPI2").unwrap();

        assert_eq!(response.len(), 1);
        assert_eq!(
            response.values(crate::Field::GeneId).collect::<Vec<_>>(),
            vec![Some("26100")]
        );

        let broken = script(dir.path(), "broken", "echo 'no such gene' >&2\nexit 3");
        let lookup = Datasets::new(LookupType::Symbol, "human").with_binaries(&broken, &dataformat);

        match lookup.lookup("NOPE") {
            Err(LookupError::Failed { stderr, .. }) => assert_eq!(stderr, "no such gene"),
            other => panic!("expected a failed lookup, got {:?}", other),
        }

        let bad_fields = script(dir.path(), "bad-fields", "echo 'unknown field' >&2\nexit 2");
        let upstream = script(
            dir.path(),
            "upstream",
            "echo '{}'\necho 'write: broken pipe' >&2\nexit 1",
        );
        let lookup = Datasets::new(LookupType::Symbol, "human").with_binaries(&upstream, &bad_fields);

        match lookup.lookup("WIPI2") {
            Err(LookupError::Failed { tool, stderr, .. }) => {
                assert!(tool.ends_with("bad-fields"));
                assert_eq!(stderr, "unknown field");
            }
            other => panic!("expected a failed dataformat, got {:?}", other),
        }

        let missing = dir.path().join("not-installed");
        let lookup = Datasets::new(LookupType::Symbol, "human").with_binaries(&missing, &dataformat);
        assert!(matches!(lookup.lookup("WIPI2"), Err(LookupError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_noisy_datasets_stderr_does_not_block() {
        let dir = tempfile::tempdir().unwrap();

        let datasets = script(
            dir.path(),
            "datasets",
            "head -c 200000 /dev/zero | tr '\\0' 'x' >&2\necho '{}'",
        );
        let dataformat = script(
            dir.path(),
            "dataformat",
            "cat > /dev/null\nprintf 'Symbol\\tNCBI GeneID\\nA\\t1\\n'",
        );

        let lookup = Datasets::new(LookupType::Symbol, "human").with_binaries(&datasets, &dataformat);
        let (tx, rx) = std::sync::mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(lookup.lookup("A").map(|r| r.len()));
        });

        let rows = rx
            .recv_timeout(std::time::Duration::from_secs(30))
            .expect("lookup did not return")
            .unwrap();
        assert_eq!(rows, 1);
    }
}
