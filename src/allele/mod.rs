//! The `allele` subcommand: reshaping multi-allelic records.
//!
//! Records stream through up to three stages, each of which may emit zero,
//! one or two records per input: rare-allele removal, splitting by allele
//! length, and allele localisation.  The driver owns all scratch buffers and
//! lends them to the stages, so the steady-state path does not allocate per
//! record.

pub mod jagged;
pub mod localise;
pub mod masks;
pub mod model;
pub mod remove;
pub mod rewrite;
pub mod split;
pub mod triangle;

use std::time::Instant;

use anyhow::{bail, Error};
use clap::Parser;
use noodles::vcf::header::record::value::map::{format, Format, Map};
use noodles::vcf::variant::RecordBuf;
use noodles::vcf::Header as VcfHeader;
use noodles_util::variant::io::Writer as VariantWriter;

use crate::allele::localise::LocaliseCache;
use crate::allele::masks::MaskSet;
use crate::allele::model::{FieldCatalog, VariantRecord};
use crate::common::noodles::{open_variant_reader, open_variant_writer};

/// Command line arguments for the `allele` sub command.
#[derive(Parser, Debug)]
#[command(about = "Reshape the alleles of multi-allelic records", long_about = None)]
pub struct Args {
    /// Path to the input VCF/BCF file, or `-` for stdin.
    #[arg(value_name = "INPUT")]
    pub path_input: String,

    /// Path to the output file, or `-` for stdout.
    #[arg(short = 'o', long = "output", default_value = "-")]
    pub path_output: String,

    /// Output compressed BCF (b), uncompressed BCF (u), compressed VCF (z),
    /// uncompressed VCF (v); or use automatic (a) detection.  Use the -Ou
    /// option when piping between subcommands to speed up performance by
    /// removing unnecessary compression/decompression and VCF<->BCF
    /// conversion.
    #[arg(short = 'O', long = "output-type", default_value_t = 'a')]
    pub output_type: char,

    /// For multi-allelic records, remove alleles with AF < than threshold.
    /// 0 -> remove none.
    #[arg(long, default_value_t = 0.0)]
    pub rare_af_thresh: f32,

    /// Alleles shorter than this will stay in this record; longer ones are
    /// moved into a separate one. 0 -> no splitting.
    #[arg(long, default_value_t = 0)]
    pub split_by_length: usize,

    /// For multi-allelic records with more than L alleles, transform global
    /// alleles to local alleles. 0 -> never transform.
    #[arg(short = 'L', long, default_value_t = 0)]
    pub local_alleles: usize,

    /// If set, PL and AD fields are kept in addition to LPL and LAD.
    #[arg(long, default_value_t = false)]
    pub keep_global_fields: bool,

    /// If set, records with fewer than L alleles will still get an LAA-field
    /// and have their PL/AD renamed to LPL/LAD.  This increases file size
    /// and provides no advantage other than enabling same FORMATs for all
    /// records.
    #[arg(long, default_value_t = false)]
    pub transform_all: bool,
}

fn validate_args(args: &Args) -> Result<(), Error> {
    if !['a', 'b', 'u', 'z', 'v'].contains(&args.output_type) {
        bail!(
            "invalid output type {:?}, expected one of a, b, u, z, v",
            args.output_type
        );
    }
    if !(0.0..=1.0).contains(&args.rare_af_thresh) {
        bail!(
            "--rare-af-thresh must be within [0, 1], got {}",
            args.rare_af_thresh
        );
    }
    if args.split_by_length > 100_000 {
        bail!(
            "--split-by-length must be within [0, 100000], got {}",
            args.split_by_length
        );
    }
    if args.local_alleles > 127 {
        bail!(
            "--local-alleles must be within [0, 127], got {}",
            args.local_alleles
        );
    }
    Ok(())
}

/// Build the output header; localisation adds the reserved `LAA`/`LAD`/`LPL`
/// FORMAT fields.
fn build_header(header_in: &VcfHeader, args: &Args) -> VcfHeader {
    let mut header_out = header_in.clone();

    if args.local_alleles > 0 {
        if !header_out.formats().contains_key("LAA") {
            header_out.formats_mut().insert(
                "LAA".into(),
                Map::<Format>::new(
                    format::Number::Unknown,
                    format::Type::Integer,
                    "1-based indices of the locally relevant alternate alleles, \
                     in ascending order",
                ),
            );
        }
        if header_out.formats().contains_key("AD") && !header_out.formats().contains_key("LAD") {
            header_out.formats_mut().insert(
                "LAD".into(),
                Map::<Format>::new(
                    format::Number::Unknown,
                    format::Type::Integer,
                    "Allelic depths for the reference and the locally relevant \
                     alternate alleles",
                ),
            );
        }
        if header_out.formats().contains_key("PL") && !header_out.formats().contains_key("LPL") {
            header_out.formats_mut().insert(
                "LPL".into(),
                Map::<Format>::new(
                    format::Number::Unknown,
                    format::Type::Integer,
                    "Phred-scaled genotype likelihoods for the locally relevant \
                     alleles",
                ),
            );
        }
    }

    header_out
}

/// Scratch state owned by the pipeline driver and lent to the stages.
#[derive(Debug, Default)]
struct Scratch {
    masks: MaskSet,
    localise: LocaliseCache,
}

/// Localise (if configured) and write one pipeline output record.
fn finish_record(
    mut record: VariantRecord,
    record_no: usize,
    args: &Args,
    catalog: &FieldCatalog,
    scratch: &mut Scratch,
    header_out: &VcfHeader,
    writer: &mut VariantWriter,
) -> Result<(), Error> {
    let mut localised = false;

    if args.local_alleles > 0 {
        if record.n_alt() > args.local_alleles {
            tracing::trace!("record no {} allele-localisation", record_no);
            localise::localise_alleles(
                &mut record,
                catalog.n_samples(),
                args.local_alleles,
                args.keep_global_fields,
                &mut scratch.localise,
                record_no,
            )?;
            localised = true;
        } else if args.transform_all {
            tracing::trace!("record no {} allele-pseudo-localisation", record_no);
            localise::pseudo_localise_alleles(
                &mut record,
                args.keep_global_fields,
                &mut scratch.localise,
                record_no,
            )?;
            localised = true;
        }
    }

    let out = record.to_noodles(record_no)?;
    writer.write_record(header_out, &out)?;

    if localised {
        localise::salvage_cache(record, &mut scratch.localise);
    }

    Ok(())
}

/// Main entry point for the `allele` sub command.
///
/// Record numbers in diagnostics are 0-based and always refer to records of
/// the input, even when splitting creates additional output records.
pub fn run(_common: &crate::common::Args, args: &Args) -> Result<(), Error> {
    tracing::info!("config = {:#?}", &args);
    validate_args(args)?;

    tracing::info!("opening input file and reading header");
    let mut reader = open_variant_reader(&args.path_input)?;
    let header_in = reader.read_header()?;
    let catalog = FieldCatalog::from_header(&header_in);
    let header_out = build_header(&header_in, args);

    let mut writer = open_variant_writer(&args.path_output, args.output_type)?;
    writer.write_header(&header_out)?;

    tracing::info!("transforming records ...");
    let start = Instant::now();
    let mut total_read = 0usize;
    let mut total_written = 0usize;
    let mut scratch = Scratch::default();

    for (record_no, result) in reader.records(&header_in).enumerate() {
        let record = result?;
        let record_buf = RecordBuf::try_from_variant_record(&header_in, record.as_ref())?;
        let mut record = VariantRecord::from_noodles(&header_in, &record_buf, record_no)?;
        total_read += 1;

        // remove rare alleles
        if record.n_alt() > 1 && args.rare_af_thresh != 0.0 {
            tracing::trace!("record no {} allele-removal", record_no);
            let all_removed = remove::remove_rare_alleles(
                &mut record,
                &catalog,
                args.rare_af_thresh,
                &mut scratch.masks,
                record_no,
            )?;
            if all_removed {
                continue;
            }
        }

        // split by length, short half first
        if args.split_by_length > 0 && split::needs_splitting(&record, args.split_by_length) {
            tracing::trace!("record no {} splitting-by-length", record_no);

            let mut short_half = record.clone();
            if record.id != "." {
                short_half.id.push_str("_split1");
                record.id.push_str("_split2");
            }

            split::remove_alleles(
                &mut short_half,
                split::Half::Short,
                &catalog,
                args.split_by_length,
                &mut scratch.masks,
                record_no,
            )?;
            split::remove_alleles(
                &mut record,
                split::Half::Long,
                &catalog,
                args.split_by_length,
                &mut scratch.masks,
                record_no,
            )?;

            finish_record(
                short_half,
                record_no,
                args,
                &catalog,
                &mut scratch,
                &header_out,
                &mut writer,
            )?;
            total_written += 1;
        }

        finish_record(
            record,
            record_no,
            args,
            &catalog,
            &mut scratch,
            &header_out,
            &mut writer,
        )?;
        total_written += 1;
    }

    tracing::info!(
        "wrote {} records for {} input records in {:?}",
        total_written,
        total_read,
        start.elapsed()
    );

    Ok(())
}
