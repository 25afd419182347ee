//! Drop masks over alleles and genotypes.
//!
//! A transformation first marks alleles for removal in the allele mask
//! (reference included, never marked), then derives the matching masks for
//! `Number=A` and `Number=G` fields plus the reverse pair table used for
//! regenerating `GT`.  All buffers are reused across records.

use crate::allele::triangle::{gt_index, gt_size, PairTable};

/// Aligned drop masks for one record; `true` marks a position for removal.
#[derive(Clone, Debug, Default)]
pub struct MaskSet {
    /// One entry per alternate allele (`Number=A`).
    pub alt: Vec<bool>,
    /// One entry per allele, reference first (`Number=R`).
    pub allele: Vec<bool>,
    /// One entry per unordered diploid genotype (`Number=G`).
    pub genotype: Vec<bool>,
    /// Maps genotype positions back to allele pairs.
    pub pairs: PairTable,
}

impl MaskSet {
    /// Reset the allele mask for `n_alt` alternates with everything kept.
    ///
    /// Stages then mark alleles to drop via `allele[i + 1]`; index 0 is the
    /// reference and stays unmarked.
    pub fn reset_alleles(&mut self, n_alt: usize) {
        self.allele.clear();
        self.allele.resize(n_alt + 1, false);
    }

    /// Derive the alternate and genotype masks from the allele mask and make
    /// sure the pair table covers the record's triangle.
    pub fn derive(&mut self, n_alt: usize) {
        debug_assert_eq!(self.allele.len(), n_alt + 1);
        debug_assert!(!self.allele[0]);

        self.alt.clear();
        self.alt.extend_from_slice(&self.allele[1..]);

        self.genotype.clear();
        self.genotype.resize(gt_size(n_alt + 1), false);
        for b in 0..=n_alt {
            for a in 0..=b {
                self.genotype[gt_index(a, b)] = self.allele[a] || self.allele[b];
            }
        }

        self.pairs.ensure(n_alt + 1);
    }

    /// Whether every alternate allele is marked for removal.
    pub fn all_alts_dropped(&self) -> bool {
        self.alt.iter().all(|&drop| drop)
    }

    /// Whether any alternate allele is marked for removal.
    pub fn any_alt_dropped(&self) -> bool {
        self.alt.iter().any(|&drop| drop)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::allele::triangle;

    #[test]
    fn masks_are_aligned() {
        let mut masks = MaskSet::default();
        masks.reset_alleles(3);
        masks.allele[2] = true;
        masks.derive(3);

        assert_eq!(masks.alt, vec![false, true, false]);
        assert_eq!(masks.allele, vec![false, false, true, false]);
        assert_eq!(masks.genotype.len(), triangle::gt_size(4));
        for b in 0..=3 {
            for a in 0..=b {
                assert_eq!(
                    masks.genotype[triangle::gt_index(a, b)],
                    masks.allele[a] || masks.allele[b],
                    "genotype mask mismatch at ({}, {})",
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn reference_is_never_dropped() {
        let mut masks = MaskSet::default();
        masks.reset_alleles(2);
        masks.allele[1] = true;
        masks.allele[2] = true;
        masks.derive(2);

        assert!(!masks.allele[0]);
        assert!(!masks.genotype[triangle::gt_index(0, 0)]);
        assert!(masks.all_alts_dropped());
    }

    #[test]
    fn pair_table_covers_the_triangle() {
        let mut masks = MaskSet::default();
        masks.reset_alleles(2);
        masks.derive(2);

        assert_eq!(masks.pairs.pair(0), (0, 0));
        assert_eq!(masks.pairs.pair(4), (1, 2));
        assert_eq!(masks.pairs.pair(5), (2, 2));
    }
}
