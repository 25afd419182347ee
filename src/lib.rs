//! Decovar is a set of streaming tools for reshaping variant call files.
//!
//! The `allele` subcommand rewrites multi-allelic VCF/BCF records so that
//! downstream consumers can store and process them more cheaply while the
//! statistical meaning of the per-sample likelihoods is preserved.  Three
//! composable transformations are offered:
//!
//! - removal of alternate alleles whose population frequency (`AF`) falls
//!   below a threshold,
//! - splitting of a record into a short-allele and a long-allele record,
//! - projection of the globally indexed `AD`/`PL` fields onto a per-sample
//!   selection of "locally relevant" alleles (`LAA`/`LAD`/`LPL`).
//!
//! All fields with `A`, `R` or `G` multiplicity are kept consistent with the
//! surviving alleles, and the `GT` field is regenerated from the rewritten
//! `PL` values.
//!
//! ## Command Line Usage
//!
//! To run decovar, invoke the `decovar` executable.  The program provides a
//! command line help:
//!
//! ```text
//! $ decovar help
//! deCODE variant tools
//!
//! Usage: decovar [OPTIONS] <COMMAND>
//!
//! Commands:
//!   allele  Reshape the alleles of multi-allelic records
//!   help    Print this message or the help of the given subcommand(s)
//! ```

pub mod allele;
pub mod common;
