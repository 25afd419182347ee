//! Localisation of alleles: projecting global `AD`/`PL` onto the per-sample
//! set of locally relevant alleles.
//!
//! For every sample the alternates are ranked by the summed likelihood of
//! all genotypes they participate in (computed from `PL`).  The best `L`
//! alternates become the sample's local alleles: their 1-based indexes are
//! written to `LAA`, and `AD`/`PL` are projected into `LAD`/`LPL` over the
//! reference plus those alleles.  The reference is always locally relevant
//! and is not listed in `LAA`.

use std::mem;

use anyhow::{bail, Error};

use crate::allele::jagged::Jagged;
use crate::allele::model::{GenotypeValue, IntWidth, VariantRecord};
use crate::allele::triangle::{gt_index, gt_size};

/// Scratch buffers reused across records.
#[derive(Debug, Default)]
pub struct LocaliseCache {
    /// Per sample, the indexes of the retained alleles.
    laa: Jagged<i32>,
    buf8: Jagged<i8>,
    buf16: Jagged<i16>,
    buf32: Jagged<i32>,
    /// Per-allele accumulated probability and original index.
    probs: Vec<(f64, usize)>,
}

/// Selects the width-matching scratch buffer of the cache.
trait WidthBuf: IntWidth {
    fn scratch(cache: &mut LocaliseCache) -> &mut Jagged<Self>;
}

impl WidthBuf for i8 {
    fn scratch(cache: &mut LocaliseCache) -> &mut Jagged<Self> {
        &mut cache.buf8
    }
}

impl WidthBuf for i16 {
    fn scratch(cache: &mut LocaliseCache) -> &mut Jagged<Self> {
        &mut cache.buf16
    }
}

impl WidthBuf for i32 {
    fn scratch(cache: &mut LocaliseCache) -> &mut Jagged<Self> {
        &mut cache.buf32
    }
}

fn pl_to_prob(pl_value: i32) -> f64 {
    10f64.powf(f64::from(pl_value) / -10.0)
}

/// Rank the alternates of every sample and fill `cache.laa` with the best
/// `budget` of them, in ascending original-index order.
fn determine_laa<T: IntWidth>(
    cache: &mut LocaliseCache,
    pls: &Jagged<T>,
    n_alt: usize,
    n_samples: usize,
    budget: usize,
    record_no: usize,
) -> Result<(), Error> {
    if pls.flat_len() != n_samples * gt_size(n_alt + 1) {
        bail!(
            "[Record no: {}] every sample must be diploid and carry the full \
             number of PL values; a single '.' as placeholder is not supported",
            record_no
        );
    }

    let LocaliseCache { laa, probs, .. } = cache;
    laa.clear();
    laa.reserve_flat(n_samples * budget);

    for sample_pls in pls.rows() {
        probs.clear();
        probs.extend((0..=n_alt).map(|i| (0.0f64, i)));

        // every genotype's probability counts towards both of its alleles,
        // so the homozygous contribution is added twice
        for b in 0..=n_alt {
            for a in 0..=b {
                let prob = pl_to_prob(sample_pls[gt_index(a, b)].widen());
                probs[a].0 += prob;
                probs[b].0 += prob;
            }
        }

        // sort all but the reference by probability, descending
        probs[1..].sort_unstable_by(|x, y| y.0.total_cmp(&x.0));
        // then restore index order among the winners; the reference keeps
        // position 0 because its index sorts first
        probs[..=budget].sort_unstable_by_key(|&(_, index)| index);

        laa.push_row(probs[1..=budget].iter().map(|&(_, index)| index as i32));
    }

    debug_assert_eq!(laa.flat_len(), n_samples * budget);
    Ok(())
}

/// Gather `AD[0]` plus the local alleles' `AD` entries per sample.
fn project_ad<T: WidthBuf>(
    cache: &mut LocaliseCache,
    ad: &Jagged<T>,
    n_alt: usize,
    budget: usize,
    record_no: usize,
) -> Result<Jagged<T>, Error> {
    let mut out = mem::take(T::scratch(cache));
    out.clear();
    out.reserve_flat(cache.laa.len() * (budget + 1));

    if ad.len() != cache.laa.len() {
        bail!(
            "[Record no: {}] field AD covers {} samples, expected {}",
            record_no,
            ad.len(),
            cache.laa.len()
        );
    }

    for (sample_ad, sample_laa) in ad.rows().zip(cache.laa.rows()) {
        if sample_ad.len() != n_alt + 1 {
            bail!(
                "[Record no: {}] every sample must carry {} values in field AD; \
                 a single '.' as placeholder is not supported",
                record_no,
                n_alt + 1
            );
        }
        out.push_row(
            std::iter::once(sample_ad[0])
                .chain(sample_laa.iter().map(|&i| sample_ad[i as usize])),
        );
    }

    Ok(out)
}

/// Gather the `PL` entries of the genotypes over the local alleles.
///
/// The output triangle covers the reference plus `budget` alternates; `LAA`
/// does not list the reference, hence the index shift and the special cases
/// for the reference row.
fn project_pl<T: WidthBuf>(
    cache: &mut LocaliseCache,
    pls: &Jagged<T>,
    budget: usize,
) -> Jagged<T> {
    let mut out = mem::take(T::scratch(cache));
    let n_samples = cache.laa.len();
    out.scaffold(n_samples, gt_index(budget, budget) + 1, T::ZERO);

    for i in 0..n_samples {
        let sample_laa = cache.laa.row(i);
        let sample_pl = pls.row(i);
        let sample_lpl = out.row_mut(i);

        sample_lpl[0] = sample_pl[0];
        for b in 1..=budget {
            let global_b = sample_laa[b - 1] as usize;
            sample_lpl[gt_index(0, b)] = sample_pl[gt_index(0, global_b)];
            for a in 1..=b {
                let global_a = sample_laa[a - 1] as usize;
                sample_lpl[gt_index(a, b)] = sample_pl[gt_index(global_a, global_b)];
            }
        }
    }

    out
}

fn ensure_no_local_fields(record: &VariantRecord, record_no: usize) -> Result<(), Error> {
    for id in ["LAA", "LAD", "LPL"] {
        if record.format_index(id).is_some() {
            bail!(
                "[Record no: {}] cannot add {} field, because {} field is already present",
                record_no,
                id,
                id
            );
        }
    }
    Ok(())
}

/// Transform the record's global `AD`/`PL` fields into `LAA`/`LAD`/`LPL`
/// over at most `budget` local alternates per sample.
pub fn localise_alleles(
    record: &mut VariantRecord,
    n_samples: usize,
    budget: usize,
    keep_global_fields: bool,
    cache: &mut LocaliseCache,
    record_no: usize,
) -> Result<(), Error> {
    let n_alt = record.n_alt();
    debug_assert!(n_alt > budget);

    ensure_no_local_fields(record, record_no)?;

    let Some(pl_idx) = record.format_index("PL") else {
        bail!(
            "[Record no: {}] cannot compute localised alleles if the PL field is not present",
            record_no
        );
    };

    match &record.genotypes[pl_idx].1 {
        GenotypeValue::Integer8(jag) => {
            determine_laa(cache, jag, n_alt, n_samples, budget, record_no)?
        }
        GenotypeValue::Integer16(jag) => {
            determine_laa(cache, jag, n_alt, n_samples, budget, record_no)?
        }
        GenotypeValue::Integer32(jag) => {
            determine_laa(cache, jag, n_alt, n_samples, budget, record_no)?
        }
        _ => bail!(
            "[Record no: {}] PL field was in an unexpected state",
            record_no
        ),
    }
    tracing::debug!("local allele indexes: {:?}", cache.laa);

    if let Some(ad_idx) = record.format_index("AD") {
        let lad = match &record.genotypes[ad_idx].1 {
            GenotypeValue::Integer8(jag) => {
                GenotypeValue::Integer8(project_ad(cache, jag, n_alt, budget, record_no)?)
            }
            GenotypeValue::Integer16(jag) => {
                GenotypeValue::Integer16(project_ad(cache, jag, n_alt, budget, record_no)?)
            }
            GenotypeValue::Integer32(jag) => {
                GenotypeValue::Integer32(project_ad(cache, jag, n_alt, budget, record_no)?)
            }
            _ => bail!(
                "[Record no: {}] AD field was not a range of integers",
                record_no
            ),
        };
        record.genotypes.push(("LAD".to_string(), lad));
    }

    let lpl = match &record.genotypes[pl_idx].1 {
        GenotypeValue::Integer8(jag) => GenotypeValue::Integer8(project_pl(cache, jag, budget)),
        GenotypeValue::Integer16(jag) => GenotypeValue::Integer16(project_pl(cache, jag, budget)),
        GenotypeValue::Integer32(jag) => GenotypeValue::Integer32(project_pl(cache, jag, budget)),
        _ => unreachable!("checked above"),
    };
    record.genotypes.push(("LPL".to_string(), lpl));

    // LAA comes last because it is read while building LAD and LPL
    record.genotypes.push((
        "LAA".to_string(),
        GenotypeValue::Integer32(mem::take(&mut cache.laa)),
    ));

    if !keep_global_fields {
        record
            .genotypes
            .retain(|(id, _)| id != "AD" && id != "PL");
    }

    Ok(())
}

/// The identity projection used with `--transform-all` when the record has
/// no more alternates than the budget: every alternate is locally relevant
/// and `LAD`/`LPL` are plain copies of `AD`/`PL`.
pub fn pseudo_localise_alleles(
    record: &mut VariantRecord,
    keep_global_fields: bool,
    cache: &mut LocaliseCache,
    record_no: usize,
) -> Result<(), Error> {
    let n_alt = record.n_alt();

    ensure_no_local_fields(record, record_no)?;

    let Some(pl_idx) = record.format_index("PL") else {
        bail!(
            "[Record no: {}] cannot compute localised alleles if the PL field is not present",
            record_no
        );
    };
    if !matches!(
        record.genotypes[pl_idx].1,
        GenotypeValue::Integer8(_) | GenotypeValue::Integer16(_) | GenotypeValue::Integer32(_)
    ) {
        bail!(
            "[Record no: {}] PL field was in an unexpected state",
            record_no
        );
    }

    let n_samples = record.n_samples();
    cache.laa.clear();
    for _ in 0..n_samples {
        cache.laa.push_row((1..=n_alt).map(|i| i as i32));
    }

    if let Some(ad_idx) = record.format_index("AD") {
        let lad = match &record.genotypes[ad_idx].1 {
            value @ (GenotypeValue::Integer8(_)
            | GenotypeValue::Integer16(_)
            | GenotypeValue::Integer32(_)) => value.clone(),
            _ => bail!(
                "[Record no: {}] AD field was not a range of integers",
                record_no
            ),
        };
        record.genotypes.push(("LAD".to_string(), lad));
    }

    let lpl = record.genotypes[pl_idx].1.clone();
    record.genotypes.push(("LPL".to_string(), lpl));

    record.genotypes.push((
        "LAA".to_string(),
        GenotypeValue::Integer32(mem::take(&mut cache.laa)),
    ));

    if !keep_global_fields {
        record
            .genotypes
            .retain(|(id, _)| id != "AD" && id != "PL");
    }

    Ok(())
}

/// Take the jagged buffers of a written record back into the cache so that
/// their allocations are reused for the next record.
pub fn salvage_cache(record: VariantRecord, cache: &mut LocaliseCache) {
    for (id, value) in record.genotypes {
        match (id.as_str(), value) {
            ("LAA", GenotypeValue::Integer32(jag)) => cache.laa = jag,
            ("LAD" | "LPL", GenotypeValue::Integer8(jag)) => cache.buf8 = jag,
            ("LAD" | "LPL", GenotypeValue::Integer16(jag)) => cache.buf16 = jag,
            ("LAD" | "LPL", GenotypeValue::Integer32(jag)) => cache.buf32 = jag,
            _ => {}
        }
    }
}
