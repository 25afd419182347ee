//! Helper code for using noodles.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};

use anyhow::{anyhow, bail, Error};
use noodles_util::variant::io::reader::Builder as ReaderBuilder;
use noodles_util::variant::io::writer::Builder as WriterBuilder;
use noodles_util::variant::io::{CompressionMethod, Format, Reader, Writer};

/// Alias for the variant reader type that we will use.
///
/// Format (VCF/BCF) and compression are detected from the stream contents.
pub type VariantReader = Reader<Box<dyn BufRead>>;

/// Return whether `path` addresses standard input.
pub fn is_stdin(path: &str) -> bool {
    path == "-" || path == "/dev/stdin"
}

/// Return whether `path` addresses standard output.
pub fn is_stdout(path: &str) -> bool {
    path == "-" || path == "/dev/stdout"
}

/// Helper function that opens one variant reader at the given path.
pub fn open_variant_reader(path: &str) -> Result<VariantReader, Error> {
    if is_stdin(path) {
        ReaderBuilder::default()
            .build_from_reader(BufReader::new(io::stdin()))
            .map_err(|e| anyhow!("could not build variant reader from stdin: {}", e))
    } else {
        ReaderBuilder::default()
            .build_from_path(path)
            .map_err(|e| anyhow!("could not build variant reader for {}: {}", path, e))
    }
}

/// Helper function that opens one variant writer at the given path.
///
/// `output_type` follows the `bcftools` convention: `b` is compressed BCF,
/// `u` uncompressed BCF, `z` compressed VCF, `v` uncompressed VCF, and `a`
/// selects by file extension (falling back to uncompressed VCF on stdout).
pub fn open_variant_writer(path: &str, output_type: char) -> Result<Writer, Error> {
    let to_stdout = is_stdout(path);

    let output_type = if to_stdout && output_type == 'a' {
        'v'
    } else {
        output_type
    };

    if output_type == 'a' {
        return WriterBuilder::default()
            .build_from_path(path)
            .map_err(|e| anyhow!("could not build variant writer for {}: {}", path, e));
    }

    let (format, compression) = match output_type {
        'b' => (Format::Bcf, Some(CompressionMethod::Bgzf)),
        'u' => (Format::Bcf, None),
        'z' => (Format::Vcf, Some(CompressionMethod::Bgzf)),
        'v' => (Format::Vcf, None),
        c => bail!("invalid output type {:?}, expected one of a, b, u, z, v", c),
    };

    let inner: Box<dyn Write> = if to_stdout {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        Box::new(BufWriter::new(File::create(path).map_err(|e| {
            anyhow!("could not create output file {}: {}", path, e)
        })?))
    };

    Ok(WriterBuilder::default()
        .set_format(format)
        .set_compression_method(compression)
        .build_from_writer(inner))
}
