//! Reading genomes and reads from text files, and writing peaks.
//! `-` as a path means the standard input.
use crate::error::{PeakCallError, Result};
use definitions::{Chromosome, Genome, PeakSet, Read, Sample, Strand};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Error, ErrorKind, Write};
use std::path::Path;

fn invalid(line_num: usize, msg: &str, line: &str) -> PeakCallError {
    let msg = format!("line {}: {}: {}", line_num + 1, msg, line);
    Error::new(ErrorKind::InvalidData, msg).into()
}

fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    if path == Path::new("-") {
        Ok(Box::new(BufReader::new(std::io::stdin())))
    } else {
        let file = std::fs::File::open(path)?;
        Ok(Box::new(BufReader::new(file)))
    }
}

fn is_header(line: &str) -> bool {
    line.is_empty()
        || line.starts_with('#')
        || line.starts_with("track")
        || line.starts_with("browser")
}

/// Parse `name<TAB>length` lines.
pub fn parse_chrom_sizes<R: BufRead>(rdr: R) -> Result<Genome> {
    let mut chromosomes = vec![];
    for (line_num, line) in rdr.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if is_header(line) {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (name, length) = match (fields.next(), fields.next()) {
            (Some(name), Some(length)) => (name, length),
            _ => return Err(invalid(line_num, "expected a name and a length", line)),
        };
        let length: usize = length
            .parse()
            .map_err(|_| invalid(line_num, "the length is not a number", line))?;
        chromosomes.push(Chromosome::new(name, length));
    }
    debug!("INPUT\tChromosomes\t{}", chromosomes.len());
    Ok(Genome::new(chromosomes))
}

pub fn read_chrom_sizes<P: AsRef<Path>>(path: P) -> Result<Genome> {
    parse_chrom_sizes(open(path)?)
}

/// Parse BED records (`chrom start end [name [score [strand]]]`, 0-based half-open) into a sample.
/// Reads on chromosomes missing from `genome` are skipped. Reads running past the chromosome end are clipped.
pub fn parse_bed_sample<R: BufRead>(name: &str, rdr: R, genome: &Genome) -> Result<Sample> {
    let lengths: HashMap<&str, usize> = genome
        .chromosomes
        .iter()
        .map(|c| (c.name.as_str(), c.length))
        .collect();
    let mut unknown = 0;
    let mut reads = vec![];
    for (line_num, line) in rdr.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if is_header(line) {
            continue;
        }
        let fields: Vec<_> = line.split('\t').collect();
        if fields.len() < 3 {
            return Err(invalid(line_num, "expected at least 3 columns", line));
        }
        let position = |field: &str| {
            field
                .parse::<usize>()
                .map_err(|_| invalid(line_num, "the position is not a number", line))
        };
        let (start0, end) = (position(fields[1])?, position(fields[2])?);
        if end <= start0 {
            return Err(invalid(line_num, "the interval is empty", line));
        }
        let chr_len = match lengths.get(fields[0]) {
            Some(&len) => len,
            None => {
                unknown += 1;
                continue;
            }
        };
        if chr_len <= start0 {
            unknown += 1;
            continue;
        }
        let strand = fields
            .get(5)
            .map(|s| Strand::from_symbol(s))
            .unwrap_or(Strand::Unknown);
        let read = Read::new(start0 + 1, end.min(chr_len), strand);
        reads.push((fields[0].to_string(), read));
    }
    if 0 < unknown {
        warn!("INPUT\t{}\tSkipped\t{}", name, unknown);
    }
    let sample = Sample::from_reads(name, reads);
    debug!(
        "INPUT\t{}\tReads\t{}\t{}",
        name,
        sample.total_read_count(),
        sample.total_read_length()
    );
    Ok(sample)
}

/// The sample is named after the file stem.
pub fn read_bed_sample<P: AsRef<Path>>(path: P, genome: &Genome) -> Result<Sample> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "stdin".to_string());
    parse_bed_sample(&name, open(path)?, genome)
}

/// BED with the description in the track line. Unnamed peaks are named by their rank.
pub fn write_peaks_bed<W: Write>(peaks: &PeakSet, mut wtr: W) -> Result<()> {
    let description = peaks.description().replace('"', "'");
    writeln!(wtr, "track name=\"enrich\" description=\"{}\"", description)?;
    for (i, peak) in peaks.peaks().iter().enumerate() {
        let name = match peak.name.as_ref() {
            Some(name) => name.clone(),
            None => format!("peak_{}", i + 1),
        };
        let strand = peak.strand.symbol();
        let start0 = peak.start - 1;
        let chr = &peak.chromosome;
        writeln!(wtr, "{}\t{}\t{}\t{}\t.\t{}", chr, start0, peak.end, name, strand)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_peaks_json<W: Write>(peaks: &PeakSet, mut wtr: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut wtr, peaks).map_err(Error::from)?;
    writeln!(wtr)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use definitions::Interval;
    #[test]
    fn chrom_sizes() {
        let input = "# assembly\nchr1\t1000\nchr2\t250\n";
        let genome = parse_chrom_sizes(input.as_bytes()).unwrap();
        assert_eq!(genome.chromosomes.len(), 2);
        assert_eq!(genome.total_length(), 1_250);
        assert!(parse_chrom_sizes("chr1\tlong\n".as_bytes()).is_err());
        assert!(parse_chrom_sizes("chr1\n".as_bytes()).is_err());
    }
    #[test]
    fn bed_reads() {
        let genome = Genome::new(vec![Chromosome::new("chr1", 1_000)]);
        let input = "track name=reads\n\
                     chr1\t99\t149\tr1\t0\t+\n\
                     chr1\t199\t249\tr2\t0\t-\n\
                     chr1\t980\t1030\n\
                     chrUn\t10\t60\tr3\t0\t+\n";
        let sample = parse_bed_sample("chip", input.as_bytes(), &genome).unwrap();
        assert_eq!(sample.name(), "chip");
        assert_eq!(sample.total_read_count(), 3);
        let reads = sample.reads_in_chromosome("chr1");
        assert_eq!(reads[0], Read::new(100, 149, Strand::Forward));
        assert_eq!(reads[1], Read::new(200, 249, Strand::Reverse));
        assert_eq!(reads[2], Read::new(981, 1_000, Strand::Unknown));
        let malformed = "chr1\t99\n";
        let err = parse_bed_sample("chip", malformed.as_bytes(), &genome).unwrap_err();
        assert!(matches!(err, PeakCallError::Io(ref e) if e.kind() == ErrorKind::InvalidData));
        let empty = "chr1\t99\t99\n";
        assert!(parse_bed_sample("chip", empty.as_bytes(), &genome).is_err());
    }
    #[test]
    fn missing_files() {
        let genome = Genome::new(vec![Chromosome::new("chr1", 1_000)]);
        let path = std::env::temp_dir().join("enrich_io_no_such_file.bed");
        let err = read_bed_sample(&path, &genome).unwrap_err();
        assert!(matches!(err, PeakCallError::Io(ref e) if e.kind() == ErrorKind::NotFound));
        let err = read_chrom_sizes(&path).unwrap_err();
        assert!(matches!(err, PeakCallError::Io(ref e) if e.kind() == ErrorKind::NotFound));
    }
    #[test]
    fn peak_output() {
        let peaks = vec![
            Interval::new("chr1", 101, 400),
            Interval::new("chr2", 1, 300).with_name("summit"),
        ];
        let peaks = PeakSet::new("two \"peaks\"".to_string(), peaks);
        let mut bed = vec![];
        write_peaks_bed(&peaks, &mut bed).unwrap();
        let bed = String::from_utf8(bed).unwrap();
        let lines: Vec<_> = bed.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "track name=\"enrich\" description=\"two 'peaks'\"");
        assert_eq!(lines[1], "chr1\t100\t400\tpeak_1\t.\t.");
        assert_eq!(lines[2], "chr2\t0\t300\tsummit\t.\t.");
        let mut json = vec![];
        write_peaks_json(&peaks, &mut json).unwrap();
        let parsed: PeakSet = serde_json::from_slice(&json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.description(), peaks.description());
    }
}
