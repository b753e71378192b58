use anyhow::Result;
use log::{error, info, warn};

use std::fs::create_dir_all;
use std::path::PathBuf;

use config::get_progress_bar;
use gene_lookup::{Datasets, GeneLookup, LookupResponse, ANNOTATION_FIELDS};

use crate::cli::Args;
use crate::reconcile::{reconcile, Outcome, Reconciliation};
use crate::utils::{
    apply_writes, descriptor_path, output_path, save_raw, write_descriptor, DescriptorEntry,
    Worklist,
};

/// annotate `args.input` through the NCBI datasets tools
pub fn annotate_genes(args: Args) -> Result<RunSummary> {
    let lookup = Datasets::new(args.lookup_type()?, &args.taxon)
        .with_binaries(&args.datasets, &args.dataformat);

    annotate_with(&args, &lookup)
}

/// Annotate every row of the worklist, one lookup at a time.
///
/// A failed lookup is logged and reconciled as an empty response; only
/// configuration errors and a failure to write the final table abort.
pub fn annotate_with<L: GeneLookup>(args: &Args, lookup: &L) -> Result<RunSummary> {
    let policy = args.policy()?;
    let delimiter = args.delimiter()?;
    let outdir = args.outdir();

    let mut worklist = Worklist::from_path(&args.input, &args.column, delimiter)?;
    create_dir_all(&outdir)?;
    worklist.prepare(&ANNOTATION_FIELDS);

    info!(
        "Annotating {} genes from {:?} with policy '{}'",
        worklist.len(),
        args.input,
        policy
    );

    let pb = get_progress_bar(worklist.len() as u64, "Annotating genes...");
    let mut summary = RunSummary::default();
    let mut descriptor = Vec::new();

    for idx in 0..worklist.len() {
        pb.inc(1);

        let gene = match worklist.symbol(idx) {
            Some(gene) => gene.to_string(),
            None => {
                warn!("Row {}: empty {} cell, skipping lookup", idx + 1, args.column);
                summary.missing_symbols += 1;
                continue;
            }
        };

        let (response, failed) = match lookup.lookup(&gene) {
            Ok(response) => {
                if response.is_empty() {
                    warn!("{}: no records returned", gene);
                }
                (response, false)
            }
            Err(e) => {
                error!("{}: {}", gene, e);
                (LookupResponse::default(), true)
            }
        };

        if args.keep_raw && !response.is_empty() {
            if let Err(e) = save_raw(&gene, &response, &outdir) {
                error!("{}: could not write raw response: {}", gene, e);
            }
        }

        let reconciliation = reconcile(&gene, &response, policy);
        reconciliation.warnings.iter().for_each(|w| warn!("{}", w));

        summary.failed_writes += apply_writes(&reconciliation.writes, &outdir);
        worklist.merge(idx, &reconciliation.annotation);
        summary.record(&reconciliation, failed);

        if args.descriptor {
            descriptor.push(DescriptorEntry::new(&reconciliation, failed));
        }
    }

    pb.finish_and_clear();

    let output = output_path(&args.input, &outdir, policy);
    worklist.write(&output)?;

    if args.descriptor {
        write_descriptor(&descriptor, descriptor_path(&args.input, &outdir))?;
    }

    summary.output = output;
    summary.log();

    Ok(summary)
}

/// Per-run counters, logged once the table is written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub output: PathBuf,
    pub genes: usize,
    pub annotated: usize,
    pub missing_symbols: usize,
    pub failed_lookups: usize,
    pub empty: usize,
    pub skipped: usize,
    pub multiple_matches: usize,
    pub multiple_values: usize,
    pub failed_writes: usize,
}

impl RunSummary {
    fn record(&mut self, reconciliation: &Reconciliation, lookup_failed: bool) {
        self.genes += 1;

        if lookup_failed {
            self.failed_lookups += 1;
        }

        match reconciliation.outcome {
            Outcome::Empty => self.empty += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Annotated => self.annotated += 1,
        }

        if reconciliation.has_multiple_matches() {
            self.multiple_matches += 1;
        }

        if reconciliation.has_multiple_values() {
            self.multiple_values += 1;
        }
    }

    pub fn log(&self) {
        info!("Genes looked up: {}", self.genes);
        info!("Genes annotated: {}", self.annotated);
        info!(
            "Genes without records: {} [failed lookups: {}]",
            self.empty, self.failed_lookups
        );
        info!("Genes skipped: {}", self.skipped);
        info!("Genes with multiple gene matches: {}", self.multiple_matches);
        info!("Genes with multiple values: {}", self.multiple_values);

        if self.missing_symbols > 0 {
            warn!("Rows without a gene symbol: {}", self.missing_symbols);
        }

        if self.failed_writes > 0 {
            warn!("Diagnostic files not written: {}", self.failed_writes);
        }

        info!("Annotated table written to {:?}", self.output);
    }
}
