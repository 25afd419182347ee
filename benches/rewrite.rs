use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use decovar::allele::jagged::Jagged;
use decovar::allele::localise::{self, LocaliseCache};
use decovar::allele::masks::MaskSet;
use decovar::allele::model::{FieldCatalog, FieldValue, GenotypeValue, VariantRecord};
use decovar::allele::remove;
use decovar::allele::triangle;

const HEADER: &str = concat!(
    "##fileformat=VCFv4.3\n",
    "##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele frequency\">\n",
    "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n",
    "##FORMAT=<ID=AD,Number=R,Type=Integer,Description=\"Allelic depths\">\n",
    "##FORMAT=<ID=PL,Number=G,Type=Integer,Description=\"Phred-scaled genotype likelihoods\">\n",
    "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS\n",
);

const N_SAMPLES: usize = 1_000;
const N_ALT: usize = 4;

fn catalog() -> FieldCatalog {
    let mut reader = noodles::vcf::io::Reader::new(HEADER.as_bytes());
    let header = reader.read_header().unwrap();
    FieldCatalog::from_header(&header)
}

fn record() -> VariantRecord {
    let gt_len = triangle::gt_size(N_ALT + 1);
    let pls: Jagged<i32> = (0..N_SAMPLES)
        .map(|i| (0..gt_len).map(move |j| ((i + j) % 50) as i32))
        .collect();
    let ads: Jagged<i32> = (0..N_SAMPLES)
        .map(|i| (0..=N_ALT).map(move |j| ((i * j) % 30) as i32))
        .collect();

    VariantRecord {
        chrom: "chr1".into(),
        pos: Some(100),
        id: ".".into(),
        ref_allele: "A".into(),
        alt: vec!["C".into(), "G".into(), "T".into(), "AT".into()],
        qual: None,
        filters: Vec::new(),
        info: vec![(
            "AF".into(),
            Some(FieldValue::FloatVec(vec![
                Some(0.4),
                Some(1e-6),
                Some(0.3),
                Some(1e-6),
            ])),
        )],
        genotypes: vec![
            (
                "GT".into(),
                GenotypeValue::StringPerSample(vec!["0/1".into(); N_SAMPLES]),
            ),
            ("AD".into(), GenotypeValue::Integer32(ads)),
            ("PL".into(), GenotypeValue::Integer32(pls)),
        ],
    }
}

fn bench_remove_rare_alleles(c: &mut Criterion) {
    let catalog = catalog();
    let template = record();
    let mut masks = MaskSet::default();

    c.bench_function("remove_rare_alleles", |b| {
        b.iter_batched(
            || template.clone(),
            |mut record| {
                remove::remove_rare_alleles(&mut record, &catalog, 1e-5, &mut masks, 0).unwrap()
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_localise_alleles(c: &mut Criterion) {
    let template = record();
    let mut cache = LocaliseCache::default();

    c.bench_function("localise_alleles", |b| {
        b.iter_batched(
            || template.clone(),
            |mut record| {
                localise::localise_alleles(&mut record, N_SAMPLES, 2, false, &mut cache, 0)
                    .unwrap();
                record
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_remove_rare_alleles, bench_localise_alleles);
criterion_main!(benches);
