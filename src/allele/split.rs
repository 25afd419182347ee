//! Splitting multi-allelic records by allele length.
//!
//! Alternates no longer than the cutoff stay in one record, the longer ones
//! move into a second record.  Each half gets its own mask and goes through
//! the shared rewrite engine, so `PL` and `GT` are regenerated per half.

use anyhow::Error;

use crate::allele::masks::MaskSet;
use crate::allele::model::{FieldCatalog, VariantRecord};
use crate::allele::rewrite;

/// Which alternates a half keeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Half {
    /// Alternates with `len <= cutoff`.
    Short,
    /// Alternates with `len > cutoff`.
    Long,
}

/// A record needs splitting when it is multi-allelic and carries alternates
/// on both sides of the cutoff.
pub fn needs_splitting(record: &VariantRecord, cutoff: usize) -> bool {
    if record.n_alt() <= 1 {
        return false;
    }

    let has_shorter = record.alt.iter().any(|alt| alt.len() <= cutoff);
    let has_longer = record.alt.iter().any(|alt| alt.len() > cutoff);

    has_shorter && has_longer
}

/// Reduce `record` to one half of its alternates and rewrite all dependent
/// fields.
pub fn remove_alleles(
    record: &mut VariantRecord,
    keep: Half,
    catalog: &FieldCatalog,
    cutoff: usize,
    masks: &mut MaskSet,
    record_no: usize,
) -> Result<(), Error> {
    let n_alt = record.n_alt();

    masks.reset_alleles(n_alt);
    for (i, alt) in record.alt.iter().enumerate() {
        masks.allele[i + 1] = match keep {
            Half::Short => alt.len() > cutoff,
            Half::Long => alt.len() <= cutoff,
        };
    }
    masks.derive(n_alt);

    tracing::debug!("alt mask:      {:?}", masks.alt);
    tracing::debug!("allele mask:   {:?}", masks.allele);
    tracing::debug!("genotype mask: {:?}", masks.genotype);

    rewrite::apply_masks(record, catalog, masks, record_no)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::allele::model::test_support::{record_with_pl, test_catalog};
    use crate::allele::model::{FieldValue, GenotypeValue};

    fn multi_length_record() -> VariantRecord {
        let mut record = record_with_pl(
            &["AC", "ACGT", "T"],
            &[0.2, 0.2, 0.2],
            "0/2",
            &[0, 10, 20, 30, 15, 25, 40, 55, 60, 65],
        );
        record.id = "rsX".into();
        record
    }

    #[test]
    fn detects_mixed_lengths() {
        let record = multi_length_record();
        assert!(needs_splitting(&record, 1));
        assert!(!needs_splitting(&record, 10));

        let uniform = record_with_pl(&["C", "T"], &[0.5, 0.5], "0/1", &[0, 10, 40, 5, 15, 35]);
        assert!(!needs_splitting(&uniform, 1));
    }

    #[test]
    fn biallelic_records_never_split() {
        let record = record_with_pl(&["ACGT"], &[0.5], "0/1", &[0, 10, 40]);
        assert!(!needs_splitting(&record, 1));
    }

    #[test]
    fn halves_partition_the_alternates() {
        let input = multi_length_record();
        let mut short_half = input.clone();
        let mut long_half = input.clone();
        let mut masks = MaskSet::default();

        remove_alleles(&mut short_half, Half::Short, &test_catalog(1), 1, &mut masks, 0).unwrap();
        remove_alleles(&mut long_half, Half::Long, &test_catalog(1), 1, &mut masks, 0).unwrap();

        assert_eq!(short_half.alt, vec!["T".to_string()]);
        assert_eq!(
            long_half.alt,
            vec!["AC".to_string(), "ACGT".to_string()]
        );

        let mut recombined = short_half.alt.clone();
        recombined.extend(long_half.alt.iter().cloned());
        recombined.sort();
        let mut expected = input.alt.clone();
        expected.sort();
        assert_eq!(recombined, expected);
    }

    #[test]
    fn halves_regenerate_pl_and_gt() {
        let mut short_half = multi_length_record();
        let mut masks = MaskSet::default();
        remove_alleles(&mut short_half, Half::Short, &test_catalog(1), 1, &mut masks, 0).unwrap();

        // kept alleles {0, 3}: genotype positions (0,0), (0,3), (3,3)
        let GenotypeValue::Integer32(pls) = &short_half.genotypes[1].1 else {
            panic!("PL changed representation");
        };
        assert_eq!(pls.row(0), &[0, 40, 65]);

        let GenotypeValue::StringPerSample(gts) = &short_half.genotypes[0].1 else {
            panic!("GT changed representation");
        };
        assert_eq!(gts, &vec!["0/0".to_string()]);

        assert_eq!(
            short_half.info[0].1,
            Some(FieldValue::FloatVec(vec![Some(0.2)]))
        );
    }
}
