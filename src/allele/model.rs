//! The in-memory record model that the allele transformers operate on.
//!
//! Parsing and serialization stay with noodles; the conversion functions at
//! the bottom of this module are the only places that touch the noodles
//! record types.  The model keeps INFO fields as flat vectors and FORMAT
//! fields as per-field columns over all samples, with one-vector-per-sample
//! fields stored as [`Jagged`] containers so that the rewriter can compact
//! them in place.
//!
//! Missing values inside numeric buffers use the BCF reserved sentinels
//! (`i8::MIN`/`i16::MIN`/`i32::MIN`, NaN for floats) and map back to `.` on
//! output.

use std::collections::HashMap;
use std::fmt::Write as _;

use anyhow::{anyhow, bail, Error};
use noodles::core::Position;
use noodles::vcf::header::record::value::map::{format, info};
use noodles::vcf::variant::record::samples::series::value::genotype::Phasing;
use noodles::vcf::variant::record_buf::info::field::value::Array as InfoArray;
use noodles::vcf::variant::record_buf::info::field::Value as InfoValue;
use noodles::vcf::variant::record_buf::samples::sample::value::{Array as SampleArray, Genotype};
use noodles::vcf::variant::record_buf::samples::sample::Value as SampleValue;
use noodles::vcf::variant::record_buf::samples::Keys;
use noodles::vcf::variant::record_buf::{AlternateBases, Filters, Ids, Info, Samples};
use noodles::vcf::{self, variant::RecordBuf};

use crate::allele::jagged::Jagged;

/// BCF sentinel for a missing 32-bit integer value.
pub const MISSING_INTEGER: i32 = i32::MIN;

/// The integer widths the rewriter dispatches over.
///
/// The noodles adapter materializes 32-bit integers; the narrower widths are
/// carried so that rewriting never changes the width of a value it was
/// handed.
pub(crate) trait IntWidth: Copy + Ord + std::ops::SubAssign {
    const ZERO: Self;
    const MISSING: Self;
    fn widen(self) -> i32;
}

impl IntWidth for i8 {
    const ZERO: Self = 0;
    const MISSING: Self = i8::MIN;
    fn widen(self) -> i32 {
        self as i32
    }
}

impl IntWidth for i16 {
    const ZERO: Self = 0;
    const MISSING: Self = i16::MIN;
    fn widen(self) -> i32 {
        self as i32
    }
}

impl IntWidth for i32 {
    const ZERO: Self = 0;
    const MISSING: Self = i32::MIN;
    fn widen(self) -> i32 {
        self
    }
}

/// The `Number` category of a field as declared in the header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldNumber {
    /// An explicit count (`Number=1`, `Number=2`, ...).
    Fixed(usize),
    /// One value per alternate allele (`Number=A`).
    AltAlleles,
    /// One value per allele, reference included (`Number=R`).
    Alleles,
    /// One value per unordered diploid genotype (`Number=G`).
    Genotypes,
    /// Anything else (`Number=.` and friends); left untouched.
    Other,
}

/// Field multiplicities looked up from the header, plus the sample count.
#[derive(Clone, Debug, Default)]
pub struct FieldCatalog {
    infos: HashMap<String, FieldNumber>,
    formats: HashMap<String, FieldNumber>,
    n_samples: usize,
}

impl FieldCatalog {
    pub fn from_header(header: &vcf::Header) -> Self {
        Self {
            infos: header
                .infos()
                .iter()
                .map(|(id, map)| (id.clone(), FieldNumber::from_info(map.number())))
                .collect(),
            formats: header
                .formats()
                .iter()
                .map(|(id, map)| (id.clone(), FieldNumber::from_format(map.number())))
                .collect(),
            n_samples: header.sample_names().len(),
        }
    }

    pub fn info_number(&self, id: &str) -> Option<FieldNumber> {
        self.infos.get(id).copied()
    }

    pub fn format_number(&self, id: &str) -> Option<FieldNumber> {
        self.formats.get(id).copied()
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }
}

impl FieldNumber {
    fn from_info(number: info::Number) -> Self {
        match number {
            info::Number::Count(n) => FieldNumber::Fixed(n),
            info::Number::AlternateBases => FieldNumber::AltAlleles,
            info::Number::ReferenceAlternateBases => FieldNumber::Alleles,
            info::Number::Samples => FieldNumber::Genotypes,
            _ => FieldNumber::Other,
        }
    }

    fn from_format(number: format::Number) -> Self {
        match number {
            format::Number::Count(n) => FieldNumber::Fixed(n),
            format::Number::AlternateBases => FieldNumber::AltAlleles,
            format::Number::ReferenceAlternateBases => FieldNumber::Alleles,
            format::Number::Samples => FieldNumber::Genotypes,
            _ => FieldNumber::Other,
        }
    }
}

/// An INFO value: a scalar or a flat vector of one scalar family.
///
/// Element-level missing values (`.` inside a vector) are preserved.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Flag,
    Integer(i32),
    Float(f32),
    String(String),
    IntegerVec(Vec<Option<i32>>),
    FloatVec(Vec<Option<f32>>),
    StringVec(Vec<Option<String>>),
}

/// A FORMAT field column over all samples.
#[derive(Clone, Debug, PartialEq)]
pub enum GenotypeValue {
    /// One integer per sample; [`MISSING_INTEGER`] encodes `.`.
    IntegerPerSample(Vec<i32>),
    /// One float per sample; NaN encodes `.`.
    FloatPerSample(Vec<f32>),
    /// One string per sample; `"."` encodes a missing value.  `GT` is kept
    /// here in its literal text form.
    StringPerSample(Vec<String>),
    /// One vector of 8-bit integers per sample.
    Integer8(Jagged<i8>),
    /// One vector of 16-bit integers per sample.
    Integer16(Jagged<i16>),
    /// One vector of 32-bit integers per sample.
    Integer32(Jagged<i32>),
    /// One vector of floats per sample.
    Float(Jagged<f32>),
    /// One vector of strings per sample.
    String(Jagged<String>),
}

impl GenotypeValue {
    pub fn n_samples(&self) -> usize {
        match self {
            GenotypeValue::IntegerPerSample(vs) => vs.len(),
            GenotypeValue::FloatPerSample(vs) => vs.len(),
            GenotypeValue::StringPerSample(vs) => vs.len(),
            GenotypeValue::Integer8(jag) => jag.len(),
            GenotypeValue::Integer16(jag) => jag.len(),
            GenotypeValue::Integer32(jag) => jag.len(),
            GenotypeValue::Float(jag) => jag.len(),
            GenotypeValue::String(jag) => jag.len(),
        }
    }
}

/// A single variant call row.
#[derive(Clone, Debug, PartialEq)]
pub struct VariantRecord {
    pub chrom: String,
    /// 1-based position.
    pub pos: Option<usize>,
    /// The ID column verbatim; `"."` means missing.
    pub id: String,
    pub ref_allele: String,
    pub alt: Vec<String>,
    pub qual: Option<f32>,
    pub filters: Vec<String>,
    pub info: Vec<(String, Option<FieldValue>)>,
    pub genotypes: Vec<(String, GenotypeValue)>,
}

impl VariantRecord {
    pub fn n_alt(&self) -> usize {
        self.alt.len()
    }

    pub fn n_samples(&self) -> usize {
        self.genotypes
            .first()
            .map(|(_, value)| value.n_samples())
            .unwrap_or(0)
    }

    /// Position of the FORMAT field `id`, if present.
    pub fn format_index(&self, id: &str) -> Option<usize> {
        self.genotypes.iter().position(|(key, _)| key == id)
    }

    /// Build the model record from a parsed noodles record.
    pub fn from_noodles(
        header: &vcf::Header,
        record: &RecordBuf,
        record_no: usize,
    ) -> Result<Self, Error> {
        let id = {
            let ids: Vec<String> = record.ids().as_ref().iter().cloned().collect();
            if ids.is_empty() {
                String::from(".")
            } else {
                ids.join(";")
            }
        };

        let info = record
            .info()
            .as_ref()
            .iter()
            .map(|(key, value)| (key.clone(), value.as_ref().map(FieldValue::from_info_value)))
            .collect();

        let samples = record.samples();
        let keys: Vec<String> = samples.keys().as_ref().iter().cloned().collect();
        let n_samples = header.sample_names().len();
        let sample_views: Vec<_> = (0..n_samples)
            .map(|i| {
                samples
                    .get_index(i)
                    .ok_or_else(|| anyhow!("[Record no: {}] missing sample column {}", record_no, i))
            })
            .collect::<Result<_, _>>()?;

        let mut genotypes = Vec::with_capacity(keys.len());
        let mut column = Vec::with_capacity(n_samples);
        for key in keys {
            column.clear();
            column.extend(
                sample_views
                    .iter()
                    .map(|sample| sample.get(key.as_str()).flatten()),
            );
            let value = genotype_column_from_noodles(&key, &column, record_no)?;
            genotypes.push((key, value));
        }

        Ok(Self {
            chrom: record.reference_sequence_name().to_string(),
            pos: record.variant_start().map(|p| p.get()),
            id,
            ref_allele: record.reference_bases().to_string(),
            alt: record.alternate_bases().as_ref().to_vec(),
            qual: record.quality_score(),
            filters: record.filters().as_ref().iter().cloned().collect(),
            info,
            genotypes,
        })
    }

    /// Convert the model record back into a noodles record.
    pub fn to_noodles(&self, record_no: usize) -> Result<RecordBuf, Error> {
        let mut builder = RecordBuf::builder()
            .set_reference_sequence_name(self.chrom.clone())
            .set_reference_bases(self.ref_allele.clone());

        if let Some(pos) = self.pos {
            let start = Position::try_from(pos)
                .map_err(|e| anyhow!("[Record no: {}] invalid position {}: {}", record_no, pos, e))?;
            builder = builder.set_variant_start(start);
        }

        if self.id != "." {
            builder = builder.set_ids(self.id.split(';').map(String::from).collect::<Ids>());
        }

        if !self.alt.is_empty() {
            builder = builder.set_alternate_bases(AlternateBases::from(self.alt.clone()));
        }

        if let Some(qual) = self.qual {
            builder = builder.set_quality_score(qual);
        }

        if !self.filters.is_empty() {
            builder = builder.set_filters(self.filters.iter().cloned().collect::<Filters>());
        }

        builder = builder.set_info(
            self.info
                .iter()
                .map(|(key, value)| (key.clone(), value.as_ref().map(FieldValue::to_info_value)))
                .collect::<Info>(),
        );

        if !self.genotypes.is_empty() {
            let n_samples = self.n_samples();
            for (key, value) in &self.genotypes {
                if value.n_samples() != n_samples {
                    bail!(
                        "[Record no: {}] field {} covers {} samples, expected {}",
                        record_no,
                        key,
                        value.n_samples(),
                        n_samples
                    );
                }
            }

            let keys: Keys = self
                .genotypes
                .iter()
                .map(|(key, _)| key.clone())
                .collect();
            let mut rows: Vec<Vec<Option<SampleValue>>> =
                vec![Vec::with_capacity(self.genotypes.len()); n_samples];
            for (key, value) in &self.genotypes {
                for (i, row) in rows.iter_mut().enumerate() {
                    row.push(value.to_sample_value(key, i, record_no)?);
                }
            }
            builder = builder.set_samples(Samples::new(keys, rows));
        }

        Ok(builder.build())
    }
}

impl FieldValue {
    fn from_info_value(value: &InfoValue) -> Self {
        match value {
            InfoValue::Flag => FieldValue::Flag,
            InfoValue::Integer(n) => FieldValue::Integer(*n),
            InfoValue::Float(f) => FieldValue::Float(*f),
            InfoValue::Character(c) => FieldValue::String(c.to_string()),
            InfoValue::String(s) => FieldValue::String(s.clone()),
            InfoValue::Array(InfoArray::Integer(vs)) => FieldValue::IntegerVec(vs.clone()),
            InfoValue::Array(InfoArray::Float(vs)) => FieldValue::FloatVec(vs.clone()),
            InfoValue::Array(InfoArray::Character(vs)) => FieldValue::StringVec(
                vs.iter().map(|v| v.map(|c| c.to_string())).collect(),
            ),
            InfoValue::Array(InfoArray::String(vs)) => FieldValue::StringVec(vs.clone()),
        }
    }

    fn to_info_value(&self) -> InfoValue {
        match self {
            FieldValue::Flag => InfoValue::Flag,
            FieldValue::Integer(n) => InfoValue::Integer(*n),
            FieldValue::Float(f) => InfoValue::Float(*f),
            FieldValue::String(s) => InfoValue::String(s.clone()),
            FieldValue::IntegerVec(vs) => InfoValue::Array(InfoArray::Integer(vs.clone())),
            FieldValue::FloatVec(vs) => InfoValue::Array(InfoArray::Float(vs.clone())),
            FieldValue::StringVec(vs) => InfoValue::Array(InfoArray::String(vs.clone())),
        }
    }
}

impl GenotypeValue {
    fn to_sample_value(
        &self,
        key: &str,
        sample: usize,
        record_no: usize,
    ) -> Result<Option<SampleValue>, Error> {
        let value = match self {
            GenotypeValue::IntegerPerSample(vs) => {
                let v = vs[sample];
                (v != MISSING_INTEGER).then_some(SampleValue::Integer(v))
            }
            GenotypeValue::FloatPerSample(vs) => {
                let v = vs[sample];
                (!v.is_nan()).then_some(SampleValue::Float(v))
            }
            GenotypeValue::StringPerSample(vs) => {
                let v = &vs[sample];
                if v == "." {
                    None
                } else if key == "GT" {
                    let genotype: Genotype = v.parse().map_err(|e| {
                        anyhow!("[Record no: {}] invalid genotype {:?}: {}", record_no, v, e)
                    })?;
                    Some(SampleValue::Genotype(genotype))
                } else {
                    Some(SampleValue::String(v.clone()))
                }
            }
            GenotypeValue::Integer8(jag) => int_row_to_value(jag.row(sample)),
            GenotypeValue::Integer16(jag) => int_row_to_value(jag.row(sample)),
            GenotypeValue::Integer32(jag) => int_row_to_value(jag.row(sample)),
            GenotypeValue::Float(jag) => {
                let row = jag.row(sample);
                (!row.is_empty()).then(|| {
                    SampleValue::Array(SampleArray::Float(
                        row.iter().map(|&v| (!v.is_nan()).then_some(v)).collect(),
                    ))
                })
            }
            GenotypeValue::String(jag) => {
                let row = jag.row(sample);
                (!row.is_empty()).then(|| {
                    SampleValue::Array(SampleArray::String(
                        row.iter()
                            .map(|v| (v != ".").then(|| v.clone()))
                            .collect(),
                    ))
                })
            }
        };

        Ok(value)
    }
}

fn int_row_to_value<T: IntWidth>(row: &[T]) -> Option<SampleValue> {
    (!row.is_empty()).then(|| {
        SampleValue::Array(SampleArray::Integer(
            row.iter()
                .map(|&v| (v != T::MISSING).then(|| v.widen()))
                .collect(),
        ))
    })
}

/// Classify one FORMAT column and pull it out of the noodles rows.
fn genotype_column_from_noodles(
    key: &str,
    column: &[Option<&SampleValue>],
    record_no: usize,
) -> Result<GenotypeValue, Error> {
    let type_error = |found: &SampleValue| {
        anyhow!(
            "[Record no: {}] field {} has inconsistently typed values ({:?})",
            record_no,
            key,
            found
        )
    };

    // The first materialized value decides the column shape.
    let first = column.iter().flatten().next();

    match first {
        None => Ok(GenotypeValue::StringPerSample(vec![
            String::from(".");
            column.len()
        ])),
        Some(SampleValue::Genotype(_)) => {
            let mut out = Vec::with_capacity(column.len());
            for value in column {
                match value {
                    None => out.push(String::from(".")),
                    Some(SampleValue::Genotype(genotype)) => out.push(genotype_to_string(genotype)),
                    Some(other) => return Err(type_error(other)),
                }
            }
            Ok(GenotypeValue::StringPerSample(out))
        }
        Some(SampleValue::Integer(_)) => {
            let mut out = Vec::with_capacity(column.len());
            for value in column {
                match value {
                    None => out.push(MISSING_INTEGER),
                    Some(SampleValue::Integer(v)) => out.push(*v),
                    Some(other) => return Err(type_error(other)),
                }
            }
            Ok(GenotypeValue::IntegerPerSample(out))
        }
        Some(SampleValue::Float(_)) => {
            let mut out = Vec::with_capacity(column.len());
            for value in column {
                match value {
                    None => out.push(f32::NAN),
                    Some(SampleValue::Float(v)) => out.push(*v),
                    Some(other) => return Err(type_error(other)),
                }
            }
            Ok(GenotypeValue::FloatPerSample(out))
        }
        Some(SampleValue::String(_)) | Some(SampleValue::Character(_)) => {
            let mut out = Vec::with_capacity(column.len());
            for value in column {
                match value {
                    None => out.push(String::from(".")),
                    Some(SampleValue::String(s)) => out.push(s.clone()),
                    Some(SampleValue::Character(c)) => out.push(c.to_string()),
                    Some(other) => return Err(type_error(other)),
                }
            }
            Ok(GenotypeValue::StringPerSample(out))
        }
        Some(SampleValue::Array(first_array)) => match first_array {
            SampleArray::Integer(_) => {
                let mut jag = Jagged::default();
                for value in column {
                    match value {
                        None => jag.push_row([]),
                        Some(SampleValue::Integer(v)) => jag.push_row([*v]),
                        Some(SampleValue::Array(SampleArray::Integer(vs))) => {
                            jag.push_row(vs.iter().map(|v| v.unwrap_or(MISSING_INTEGER)));
                        }
                        Some(other) => return Err(type_error(other)),
                    }
                }
                Ok(GenotypeValue::Integer32(jag))
            }
            SampleArray::Float(_) => {
                let mut jag = Jagged::default();
                for value in column {
                    match value {
                        None => jag.push_row([]),
                        Some(SampleValue::Float(v)) => jag.push_row([*v]),
                        Some(SampleValue::Array(SampleArray::Float(vs))) => {
                            jag.push_row(vs.iter().map(|v| v.unwrap_or(f32::NAN)));
                        }
                        Some(other) => return Err(type_error(other)),
                    }
                }
                Ok(GenotypeValue::Float(jag))
            }
            SampleArray::String(_) | SampleArray::Character(_) => {
                let mut jag = Jagged::default();
                for value in column {
                    match value {
                        None => jag.push_row([]),
                        Some(SampleValue::String(s)) => jag.push_row([s.clone()]),
                        Some(SampleValue::Array(SampleArray::String(vs))) => {
                            jag.push_row(
                                vs.iter().map(|v| v.clone().unwrap_or_else(|| ".".into())),
                            );
                        }
                        Some(SampleValue::Array(SampleArray::Character(vs))) => {
                            jag.push_row(vs.iter().map(|v| {
                                v.map(|c| c.to_string()).unwrap_or_else(|| ".".into())
                            }));
                        }
                        Some(other) => return Err(type_error(other)),
                    }
                }
                Ok(GenotypeValue::String(jag))
            }
        },
    }
}

fn genotype_to_string(genotype: &Genotype) -> String {
    let mut out = String::new();
    for (i, allele) in genotype.as_ref().iter().enumerate() {
        if i > 0 {
            out.push(if allele.phasing() == Phasing::Phased {
                '|'
            } else {
                '/'
            });
        }
        match allele.position() {
            Some(position) => {
                let _ = write!(out, "{}", position);
            }
            None => out.push('.'),
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Builders for model records used across the allele test modules.

    use super::*;

    /// A one-sample record with `GT:PL` and an `AF` INFO field.
    pub(crate) fn record_with_pl(
        alt: &[&str],
        afs: &[f32],
        gt: &str,
        pl: &[i32],
    ) -> VariantRecord {
        VariantRecord {
            chrom: "chr1".into(),
            pos: Some(100),
            id: ".".into(),
            ref_allele: "A".into(),
            alt: alt.iter().map(|s| s.to_string()).collect(),
            qual: None,
            filters: Vec::new(),
            info: vec![(
                "AF".into(),
                Some(FieldValue::FloatVec(afs.iter().map(|&f| Some(f)).collect())),
            )],
            genotypes: vec![
                (
                    "GT".into(),
                    GenotypeValue::StringPerSample(vec![gt.to_string()]),
                ),
                (
                    "PL".into(),
                    GenotypeValue::Integer32([pl.iter().copied()].into_iter().collect()),
                ),
            ],
        }
    }

    /// The standard catalog used by the unit tests: `AF` is `A`, `AD` is
    /// `R`, `PL` is `G`, `GT` and `DP` are scalars.
    pub(crate) fn test_catalog(n_samples: usize) -> FieldCatalog {
        FieldCatalog {
            infos: [
                ("AF".to_string(), FieldNumber::AltAlleles),
                ("AC".to_string(), FieldNumber::AltAlleles),
                ("AN".to_string(), FieldNumber::Fixed(1)),
                ("DP".to_string(), FieldNumber::Fixed(1)),
            ]
            .into_iter()
            .collect(),
            formats: [
                ("GT".to_string(), FieldNumber::Fixed(1)),
                ("AD".to_string(), FieldNumber::Alleles),
                ("PL".to_string(), FieldNumber::Genotypes),
                ("DP".to_string(), FieldNumber::Fixed(1)),
                ("LAA".to_string(), FieldNumber::Other),
                ("LAD".to_string(), FieldNumber::Other),
                ("LPL".to_string(), FieldNumber::Other),
            ]
            .into_iter()
            .collect(),
            n_samples,
        }
    }
}
