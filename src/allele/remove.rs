//! Removal of rare alternate alleles.
//!
//! Alleles whose `AF` INFO value falls below the configured threshold are
//! dropped and all `A`/`R`/`G` fields are rewritten accordingly.

use anyhow::{bail, Error};

use crate::allele::masks::MaskSet;
use crate::allele::model::{FieldCatalog, FieldValue, VariantRecord};
use crate::allele::rewrite;

/// Mark every alternate with `AF < threshold` in the allele mask.
fn determine_rare_alleles(
    record: &VariantRecord,
    threshold: f32,
    masks: &mut MaskSet,
    record_no: usize,
) -> Result<(), Error> {
    let n_alt = record.n_alt();
    masks.reset_alleles(n_alt);

    let Some((_, value)) = record.info.iter().find(|(id, _)| id == "AF") else {
        bail!("[Record no: {}] no AF field in record", record_no);
    };

    let Some(FieldValue::FloatVec(afs)) = value else {
        bail!(
            "[Record no: {}] AF field of multi-allelic record wasn't a float vector",
            record_no
        );
    };

    if afs.len() != n_alt {
        bail!(
            "[Record no: {}] AF field of multi-allelic record has wrong size: {}, \
             but {} was expected",
            record_no,
            afs.len(),
            n_alt
        );
    }

    for (i, af) in afs.iter().enumerate() {
        // a missing AF entry never marks its allele as rare
        if let Some(af) = af {
            if *af < threshold {
                masks.allele[i + 1] = true;
            }
        }
    }

    Ok(())
}

/// Drop the rare alleles of `record` and rewrite all dependent fields.
///
/// Returns `true` if every alternate was removed and the whole record should
/// be skipped.
pub fn remove_rare_alleles(
    record: &mut VariantRecord,
    catalog: &FieldCatalog,
    threshold: f32,
    masks: &mut MaskSet,
    record_no: usize,
) -> Result<bool, Error> {
    let n_alt = record.n_alt();

    determine_rare_alleles(record, threshold, masks, record_no)?;
    masks.derive(n_alt);

    tracing::debug!("alt mask:      {:?}", masks.alt);
    tracing::debug!("allele mask:   {:?}", masks.allele);
    tracing::debug!("genotype mask: {:?}", masks.genotype);

    if masks.all_alts_dropped() {
        tracing::debug!(
            "record no {} would have no remaining alleles and is skipped completely",
            record_no
        );
        return Ok(true);
    }

    if masks.any_alt_dropped() {
        rewrite::apply_masks(record, catalog, masks, record_no)?;
    }

    Ok(false)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::allele::model::test_support::{record_with_pl, test_catalog};
    use crate::allele::model::GenotypeValue;

    #[test]
    fn drops_one_rare_allele() {
        let mut record =
            record_with_pl(&["C", "T"], &[0.5, 1e-6], "0/1", &[0, 10, 40, 5, 15, 35]);
        let mut masks = MaskSet::default();

        let dropped =
            remove_rare_alleles(&mut record, &test_catalog(1), 1e-5, &mut masks, 0).unwrap();

        assert!(!dropped);
        assert_eq!(record.alt, vec!["C".to_string()]);
        assert_eq!(
            record.info[0].1,
            Some(FieldValue::FloatVec(vec![Some(0.5)]))
        );
        let GenotypeValue::Integer32(pls) = &record.genotypes[1].1 else {
            panic!("PL changed representation");
        };
        assert_eq!(pls.row(0), &[0, 10, 40]);
    }

    #[test]
    fn skips_record_when_all_alternates_are_rare() {
        let mut record =
            record_with_pl(&["C", "T"], &[1e-7, 1e-7], "0/1", &[0, 10, 40, 5, 15, 35]);
        let mut masks = MaskSet::default();

        let dropped =
            remove_rare_alleles(&mut record, &test_catalog(1), 1e-5, &mut masks, 0).unwrap();

        assert!(dropped);
    }

    #[test]
    fn untouched_without_rare_alleles() {
        let mut record = record_with_pl(&["C", "T"], &[0.5, 0.5], "0/1", &[0, 10, 40, 5, 15, 35]);
        let before = record.clone();
        let mut masks = MaskSet::default();

        let dropped =
            remove_rare_alleles(&mut record, &test_catalog(1), 1e-5, &mut masks, 0).unwrap();

        assert!(!dropped);
        assert_eq!(record, before);
    }

    #[test]
    fn missing_af_is_fatal() {
        let mut record = record_with_pl(&["C", "T"], &[0.5, 0.5], "0/1", &[0, 10, 40, 5, 15, 35]);
        record.info.clear();
        let mut masks = MaskSet::default();

        let err = remove_rare_alleles(&mut record, &test_catalog(1), 1e-5, &mut masks, 3)
            .unwrap_err();
        assert!(err.to_string().contains("no AF field"));
        assert!(err.to_string().contains("Record no: 3"));
    }

    #[test]
    fn af_of_wrong_size_is_fatal() {
        let mut record = record_with_pl(&["C", "T"], &[0.5], "0/1", &[0, 10, 40, 5, 15, 35]);
        let mut masks = MaskSet::default();

        let err = remove_rare_alleles(&mut record, &test_catalog(1), 1e-5, &mut masks, 0)
            .unwrap_err();
        assert!(err.to_string().contains("wrong size"));
    }

    #[test]
    fn missing_af_entries_are_kept() {
        let mut record = record_with_pl(&["C", "T"], &[0.5, 0.5], "0/1", &[0, 10, 40, 5, 15, 35]);
        record.info[0].1 = Some(FieldValue::FloatVec(vec![Some(0.5), None]));
        let before_alt = record.alt.clone();
        let mut masks = MaskSet::default();

        let dropped =
            remove_rare_alleles(&mut record, &test_catalog(1), 1e-5, &mut masks, 0).unwrap();

        assert!(!dropped);
        assert_eq!(record.alt, before_alt);
    }
}
