//! Mask-driven rewriting of `A`/`R`/`G` fields.
//!
//! Given the masks of [`MaskSet`](crate::allele::masks::MaskSet), every
//! INFO/FORMAT field whose header `Number` is `A`, `R` or `G` is compacted
//! in place, the per-sample `PL` vectors are re-normalised so their minimum
//! is zero, and `GT` is regenerated from the new `PL`.

use std::fmt::Write as _;

use anyhow::{bail, Error};

use crate::allele::jagged::Jagged;
use crate::allele::masks::MaskSet;
use crate::allele::model::{
    FieldCatalog, FieldNumber, FieldValue, GenotypeValue, IntWidth, VariantRecord,
};
use crate::allele::triangle::PairTable;

/// Remove every element whose block-relative index is marked in `mask`,
/// preserving the order of the remainder.
///
/// The index is taken modulo the mask length, so the same routine serves
/// plain vectors and the flat buffer of a jagged container (where each
/// sample block has length `mask.len()`).
pub fn retain_by_mask<T>(vec: &mut Vec<T>, mask: &[bool]) {
    let mut i = 0usize;
    vec.retain(|_| {
        let keep = !mask[i % mask.len()];
        i += 1;
        keep
    });
}

fn kept_count(mask: &[bool]) -> usize {
    mask.iter().filter(|&&drop| !drop).count()
}

/// Compact every sample row of `jag` by `mask` and rewrite the delimiters.
fn rewrite_jagged<T>(
    jag: &mut Jagged<T>,
    mask: &[bool],
    id: &str,
    record_no: usize,
) -> Result<(), Error> {
    let n_samples = jag.len();
    let per_sample_before = mask.len();
    let per_sample_after = kept_count(mask);

    if jag.flat_len() != n_samples * per_sample_before {
        bail!(
            "[Record no: {}] every sample must carry {} values in field {}; \
             a single '.' as placeholder is currently not supported",
            record_no,
            per_sample_before,
            id
        );
    }

    let (data, delims) = jag.raw_parts_mut();
    retain_by_mask(data, mask);
    for (i, delim) in delims.iter_mut().enumerate() {
        *delim = i * per_sample_after;
    }

    debug_assert_eq!(jag.flat_len(), n_samples * per_sample_after);
    Ok(())
}

/// Rewrite all INFO fields with `A` or `R` multiplicity.
pub fn update_infos(
    info: &mut [(String, Option<FieldValue>)],
    catalog: &FieldCatalog,
    masks: &MaskSet,
    record_no: usize,
) -> Result<(), Error> {
    for (id, value) in info.iter_mut() {
        let Some(number) = catalog.info_number(id) else {
            bail!(
                "[Record no: {}] INFO field {} is not defined in the header",
                record_no,
                id
            );
        };

        let mask = match number {
            FieldNumber::Alleles => &masks.allele,
            FieldNumber::AltAlleles => &masks.alt,
            _ => continue,
        };

        let Some(value) = value else {
            bail!(
                "[Record no: {}] a single '.' as placeholder for field {} \
                 is currently not supported",
                record_no,
                id
            );
        };

        let len = match value {
            FieldValue::IntegerVec(vs) => vs.len(),
            FieldValue::FloatVec(vs) => vs.len(),
            FieldValue::StringVec(vs) => vs.len(),
            _ => bail!(
                "[Record no: {}] expected a vector when trimming field {}",
                record_no,
                id
            ),
        };
        if len != mask.len() {
            bail!(
                "[Record no: {}] expected {} elements in field {}, but got {}",
                record_no,
                mask.len(),
                id,
                len
            );
        }

        match value {
            FieldValue::IntegerVec(vs) => retain_by_mask(vs, mask),
            FieldValue::FloatVec(vs) => retain_by_mask(vs, mask),
            FieldValue::StringVec(vs) => retain_by_mask(vs, mask),
            _ => unreachable!(),
        }
    }

    Ok(())
}

/// Rewrite all FORMAT fields with `A`, `R` or `G` multiplicity and
/// re-normalise `PL`.
pub fn update_genotypes(
    genotypes: &mut [(String, GenotypeValue)],
    catalog: &FieldCatalog,
    masks: &MaskSet,
    record_no: usize,
) -> Result<(), Error> {
    for (id, value) in genotypes.iter_mut() {
        let Some(number) = catalog.format_number(id) else {
            bail!(
                "[Record no: {}] FORMAT field {} is not defined in the header",
                record_no,
                id
            );
        };

        let mask = match number {
            FieldNumber::Alleles => &masks.allele,
            FieldNumber::AltAlleles => &masks.alt,
            FieldNumber::Genotypes => &masks.genotype,
            _ => continue,
        };

        match value {
            GenotypeValue::Integer8(jag) => rewrite_jagged(jag, mask, id, record_no)?,
            GenotypeValue::Integer16(jag) => rewrite_jagged(jag, mask, id, record_no)?,
            GenotypeValue::Integer32(jag) => rewrite_jagged(jag, mask, id, record_no)?,
            GenotypeValue::Float(jag) => rewrite_jagged(jag, mask, id, record_no)?,
            GenotypeValue::String(jag) => rewrite_jagged(jag, mask, id, record_no)?,
            _ => bail!(
                "[Record no: {}] expected one vector per sample when trimming field {}",
                record_no,
                id
            ),
        }

        // PL values are renormalised so that the smallest PL value is 0.
        if id.as_str() == "PL" {
            match value {
                GenotypeValue::Integer8(jag) => renormalize_int_pl(jag),
                GenotypeValue::Integer16(jag) => renormalize_int_pl(jag),
                GenotypeValue::Integer32(jag) => renormalize_int_pl(jag),
                GenotypeValue::Float(jag) => renormalize_float_pl(jag),
                _ => {}
            }
        }
    }

    Ok(())
}

fn renormalize_int_pl<T: IntWidth>(jag: &mut Jagged<T>) {
    for i in 0..jag.len() {
        let row = jag.row_mut(i);
        if let Some(min) = row.iter().copied().min() {
            if min > T::ZERO {
                for value in row {
                    *value -= min;
                }
            }
        }
    }
}

fn renormalize_float_pl(jag: &mut Jagged<f32>) {
    for i in 0..jag.len() {
        let row = jag.row_mut(i);
        let min = row.iter().copied().fold(f32::INFINITY, f32::min);
        if min.is_finite() && min > 0.0 {
            for value in row {
                *value -= min;
            }
        }
    }
}

fn two_fields_mut(
    fields: &mut [(String, GenotypeValue)],
    i: usize,
    j: usize,
) -> (&mut GenotypeValue, &mut GenotypeValue) {
    debug_assert_ne!(i, j);
    if i < j {
        let (left, right) = fields.split_at_mut(j);
        (&mut left[i].1, &mut right[0].1)
    } else {
        let (left, right) = fields.split_at_mut(i);
        (&mut right[0].1, &mut left[j].1)
    }
}

/// Replace each sample's `GT` by the unordered pair that minimises its `PL`.
///
/// Ties go to the smallest genotype position.  Without a `GT` or `PL` field
/// this is a no-op.
pub fn fix_gt(
    genotypes: &mut [(String, GenotypeValue)],
    pairs: &PairTable,
    record_no: usize,
) -> Result<(), Error> {
    let Some(gt_idx) = genotypes.iter().position(|(id, _)| id == "GT") else {
        return Ok(());
    };
    let Some(pl_idx) = genotypes.iter().position(|(id, _)| id == "PL") else {
        return Ok(());
    };

    let (gt_value, pl_value) = two_fields_mut(genotypes, gt_idx, pl_idx);
    let GenotypeValue::StringPerSample(gts) = gt_value else {
        bail!(
            "[Record no: {}] GT field was in an unexpected state",
            record_no
        );
    };

    match pl_value {
        GenotypeValue::Integer8(jag) => synthesize_gt(gts, jag, pairs, record_no),
        GenotypeValue::Integer16(jag) => synthesize_gt(gts, jag, pairs, record_no),
        GenotypeValue::Integer32(jag) => synthesize_gt(gts, jag, pairs, record_no),
        GenotypeValue::Float(jag) => synthesize_gt_float(gts, jag, pairs, record_no),
        _ => bail!(
            "[Record no: {}] expected one vector per sample when reading PL",
            record_no
        ),
    }
}

fn write_pair(gt: &mut String, pair: (usize, usize)) {
    gt.clear();
    // always unphased
    let _ = write!(gt, "{}/{}", pair.0, pair.1);
}

fn synthesize_gt<T: IntWidth>(
    gts: &mut [String],
    pls: &Jagged<T>,
    pairs: &PairTable,
    record_no: usize,
) -> Result<(), Error> {
    for (i, gt) in gts.iter_mut().enumerate() {
        let row = pls.row(i);
        let Some(i_min) = row
            .iter()
            .enumerate()
            .min_by_key(|(_, value)| **value)
            .map(|(pos, _)| pos)
        else {
            bail!("[Record no: {}] sample {} has an empty PL vector", record_no, i);
        };
        write_pair(gt, pairs.pair(i_min));
    }
    Ok(())
}

fn synthesize_gt_float(
    gts: &mut [String],
    pls: &Jagged<f32>,
    pairs: &PairTable,
    record_no: usize,
) -> Result<(), Error> {
    for (i, gt) in gts.iter_mut().enumerate() {
        let row = pls.row(i);
        let Some(i_min) = row
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(pos, _)| pos)
        else {
            bail!("[Record no: {}] sample {} has an empty PL vector", record_no, i);
        };
        write_pair(gt, pairs.pair(i_min));
    }
    Ok(())
}

/// Apply the masks to the whole record: ALT column, INFO fields, FORMAT
/// fields, and finally the `GT` values.
pub fn apply_masks(
    record: &mut VariantRecord,
    catalog: &FieldCatalog,
    masks: &MaskSet,
    record_no: usize,
) -> Result<(), Error> {
    retain_by_mask(&mut record.alt, &masks.alt);
    update_infos(&mut record.info, catalog, masks, record_no)?;
    update_genotypes(&mut record.genotypes, catalog, masks, record_no)?;
    fix_gt(&mut record.genotypes, &masks.pairs, record_no)?;
    Ok(())
}
