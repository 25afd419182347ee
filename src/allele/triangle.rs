//! Arithmetic for the diploid genotype triangle.
//!
//! For `n` alleles (reference included) the unordered diploid genotypes are
//! laid out in the conventional VCF order: `(0,0), (0,1), (1,1), (0,2), ...`.
//! The position of genotype `(a, b)` with `a <= b` is `b * (b + 1) / 2 + a`,
//! and there are `n * (n + 1) / 2` genotypes in total.

/// Position of the unordered allele pair `(a, b)` in a `Number=G` vector.
///
/// Requires `a <= b`.
pub fn gt_index(a: usize, b: usize) -> usize {
    debug_assert!(a <= b);
    b * (b + 1) / 2 + a
}

/// Number of unordered diploid genotypes over `n_alleles` alleles
/// (reference included).
pub fn gt_size(n_alleles: usize) -> usize {
    n_alleles * (n_alleles + 1) / 2
}

/// Reverse lookup from genotype position back to the allele pair.
///
/// The table only ever grows; it is rebuilt when a record carries more
/// alleles than any record seen before and reused otherwise.
#[derive(Clone, Debug, Default)]
pub struct PairTable {
    pairs: Vec<(usize, usize)>,
}

impl PairTable {
    /// Make sure the table covers all genotypes over `n_alleles` alleles.
    pub fn ensure(&mut self, n_alleles: usize) {
        let size = gt_size(n_alleles);
        if self.pairs.len() < size {
            self.pairs.resize(size, (0, 0));
            for b in 0..n_alleles {
                for a in 0..=b {
                    self.pairs[gt_index(a, b)] = (a, b);
                }
            }
        }
    }

    /// The allele pair at genotype position `i`.
    pub fn pair(&self, i: usize) -> (usize, usize) {
        self.pairs[i]
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 0, 0)]
    #[case(0, 1, 1)]
    #[case(1, 1, 2)]
    #[case(0, 2, 3)]
    #[case(1, 2, 4)]
    #[case(2, 2, 5)]
    #[case(0, 3, 6)]
    #[case(3, 3, 9)]
    fn gt_index_matches_vcf_layout(#[case] a: usize, #[case] b: usize, #[case] expected: usize) {
        assert_eq!(gt_index(a, b), expected);
    }

    #[rstest]
    #[case(1, 1)]
    #[case(2, 3)]
    #[case(3, 6)]
    #[case(4, 10)]
    fn gt_size_is_triangle_number(#[case] n_alleles: usize, #[case] expected: usize) {
        assert_eq!(gt_size(n_alleles), expected);
        assert_eq!(gt_size(n_alleles), gt_index(n_alleles - 1, n_alleles - 1) + 1);
    }

    #[test]
    fn pair_table_inverts_the_formula() {
        let mut table = PairTable::default();
        table.ensure(4);

        assert_eq!(table.len(), gt_size(4));
        for b in 0..4 {
            for a in 0..=b {
                assert_eq!(table.pair(gt_index(a, b)), (a, b));
            }
        }
    }

    #[test]
    fn pair_table_only_grows() {
        let mut table = PairTable::default();
        table.ensure(5);
        let before = table.len();
        table.ensure(2);
        assert_eq!(table.len(), before);
    }
}
