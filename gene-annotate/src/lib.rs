pub mod cli;
pub mod core;
pub mod reconcile;
pub mod utils;

pub use crate::core::{annotate_genes, annotate_with, RunSummary};
pub use reconcile::{reconcile, Annotation, DiagnosticKind, DiagnosticWrite, Policy, Reconciliation};
