//! The simulator driver: parses the command line, streams a CSV trace file
//! into [`TraceRecord`]s, replays them against the selected cache, and
//! writes the eight `data-ml-*`/`header-ml-*` report files a caller consumes
//! (the `Reporter` collaborator spec.md treats as external to the core).
//!
//! Everything in this file is driver plumbing; the replacement-policy logic
//! it calls into lives in the `blockcache_sim` library.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use blockcache_sim::cache::create_cache;
use blockcache_sim::error::Error;
use blockcache_sim::record::TraceRecord;
use blockcache_sim::simulator::{Simulator, SimulatorConfig};
use blockcache_sim::size::parse_cache_size;
use blockcache_sim::stats::Reporter;

const MINUTE_SECS: i64 = 60;
const HOUR_SECS: i64 = 3600;

/// Seed threaded through every sample-based cache's RNG (hash-table
/// sampling, Thompson draws, LinUCB jitter). Fixed rather than
/// time-derived so a run is reproducible byte-for-byte; see DESIGN.md.
const RNG_SEED: u64 = 0xB10C_CAC4E;

/// Replay a block-access trace against a configurable cache replacement
/// policy and report miss-ratio behavior over time.
#[derive(Parser, Debug)]
#[command(name = "simulate", version, about)]
struct Cli {
    /// One of lru, opt, arc, gdsize, pylru, pymru, pylfu, pyhb, ts, linucb,
    /// optionally suffixed with `_hybrid` to enable row-key coalescing.
    cache_type: String,

    /// Cache capacity: a bare byte count, or an integer suffixed with
    /// `K`/`M`/`G`/`T` for power-of-two multiples (e.g. `4M`, `2G`).
    cache_size: String,

    /// Divides `cache_size` to model only a sampled fraction of production
    /// traffic (effective capacity = `cache_size / downsample_size`).
    downsample_size: u64,

    /// Running miss-ratio counters are reset once this many seconds of
    /// trace time have elapsed, so steady-state stats aren't polluted by
    /// cold-start misses. The per-bucket timeline still covers warmup.
    warmup_seconds: i64,

    /// Path to the input CSV trace file.
    trace_file_path: PathBuf,

    /// Directory the report files are written into; created if missing.
    result_dir: PathBuf,

    /// Stop after this many trace records; `-1` means unbounded.
    max_accesses_to_process: i64,

    /// Only replay records whose `cf_name` matches this value; `"all"`
    /// matches every record.
    target_cf_name: String,

    /// Raise the tracing filter to `debug` (stackable with `RUST_LOG`).
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cache_size = parse_cache_size(&cli.cache_size).context("parsing cache_size")?;
    let max_accesses_to_process = if cli.max_accesses_to_process < 0 {
        None
    } else {
        Some(cli.max_accesses_to_process as u64)
    };

    info!(
        cache_type = %cli.cache_type,
        cache_size,
        downsample_size = cli.downsample_size,
        "loading trace"
    );
    let records = load_trace(&cli.trace_file_path, &cli.target_cf_name)?;
    info!(num_records = records.len(), "trace loaded");

    let mut cache = create_cache(&cli.cache_type, cache_size, cli.downsample_size, RNG_SEED)?;

    let simulator = Simulator::new(SimulatorConfig {
        warmup_seconds: cli.warmup_seconds,
        max_accesses_to_process,
    });
    let report = simulator.run(&records, cache.as_mut());
    info!(
        num_accesses_processed = report.num_accesses_processed,
        miss_ratio = cache.miss_ratio_stats().miss_ratio(),
        "simulation complete"
    );

    std::fs::create_dir_all(&cli.result_dir)
        .with_context(|| format!("creating result_dir {}", cli.result_dir.display()))?;
    let mut reporter = FileReporter::new(cli.result_dir.clone());
    write_reports(
        &mut reporter,
        cache.as_ref(),
        &cli.cache_type,
        cache_size,
        &cli.target_cf_name,
        report.trace_start_time_us,
        report.trace_end_time_us,
    )?;

    Ok(())
}

/// Reads and decodes every line of `path` as a [`TraceRecord`], keeping only
/// the ones matching `target_cf_name` (`"all"` keeps everything). Fails
/// fast: a malformed line aborts the whole load, matching spec.md §7's
/// "no partial results emitted" rule for trace-format errors.
fn load_trace(path: &Path, target_cf_name: &str) -> Result<Vec<TraceRecord>, Error> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let line_no = idx as u64 + 1;
        let record = parse_trace_line(&line, line_no)?;
        if target_cf_name == "all" || record.cf_name == target_cf_name {
            records.push(record);
        }
    }
    Ok(records)
}

/// Decodes one CSV line in the field order documented in spec.md §6:
/// `access_time_us, block_id, block_type, block_size, cf_id, cf_name,
/// level, fd, caller, no_insert, get_id, key_id, kv_size, is_hit`.
fn parse_trace_line(line: &str, line_no: u64) -> Result<TraceRecord, Error> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 14 {
        return Err(Error::TraceFormat {
            line: line_no,
            reason: format!("expected 14 comma-separated fields, got {}", fields.len()),
        });
    }

    fn int<T: std::str::FromStr>(field: &str, name: &str, line_no: u64) -> Result<T, Error> {
        field.trim().parse::<T>().map_err(|_| Error::TraceFormat {
            line: line_no,
            reason: format!("field '{name}' is not a valid integer: '{field}'"),
        })
    }

    fn boolean(field: &str, name: &str, line_no: u64) -> Result<bool, Error> {
        match field.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(Error::TraceFormat {
                line: line_no,
                reason: format!("field '{name}' must be 0 or 1, got '{other}'"),
            }),
        }
    }

    Ok(TraceRecord {
        access_time_us: int(fields[0], "access_time_us", line_no)?,
        block_id: int(fields[1], "block_id", line_no)?,
        block_type: int(fields[2], "block_type", line_no)?,
        block_size: int(fields[3], "block_size", line_no)?,
        cf_id: int(fields[4], "cf_id", line_no)?,
        cf_name: fields[5].trim().to_string(),
        level: int(fields[6], "level", line_no)?,
        fd: int(fields[7], "fd", line_no)?,
        caller: int(fields[8], "caller", line_no)?,
        no_insert: boolean(fields[9], "no_insert", line_no)?,
        get_id: int(fields[10], "get_id", line_no)?,
        key_id: int(fields[11], "key_id", line_no)?,
        kv_size: int(fields[12], "kv_size", line_no)?,
        is_hit_observed: boolean(fields[13], "is_hit", line_no)?,
        next_access_seq_no: 0,
    })
}

#[allow(clippy::too_many_arguments)]
fn write_reports(
    reporter: &mut FileReporter,
    cache: &dyn blockcache_sim::Cache,
    cache_type: &str,
    cache_size: u64,
    cf: &str,
    trace_start_us: i64,
    trace_end_us: i64,
) -> Result<(), Error> {
    reporter.write_mrc(
        cache_type,
        cache_size,
        cf,
        cache.miss_ratio_stats().miss_ratio(),
        cache.miss_ratio_stats().num_accesses(),
    )?;

    for &time_unit_secs in &[MINUTE_SECS, HOUR_SECS] {
        let (stats, policy_stats) = if time_unit_secs == MINUTE_SECS {
            (cache.miss_ratio_stats(), cache.policy_stats())
        } else {
            (cache.per_hour_miss_ratio_stats(), cache.per_hour_policy_stats())
        };
        let start_bucket = trace_start_us / (1_000_000 * time_unit_secs);

        reporter.write_miss_timeline(
            cache_type,
            cache_size,
            cf,
            time_unit_secs,
            start_bucket,
            &stats.miss_timeline(trace_start_us, trace_end_us),
        )?;
        reporter.write_miss_ratio_timeline(
            cache_type,
            cache_size,
            cf,
            time_unit_secs,
            start_bucket,
            &stats.miss_ratio_timeline(trace_start_us, trace_end_us),
        )?;

        if let Some(policy_stats) = policy_stats {
            let policy_names = policy_stats.policy_names();
            let counts: Vec<Vec<u64>> = (0..policy_names.len())
                .map(|i| policy_stats.policy_timeline(i, trace_start_us, trace_end_us))
                .collect();
            let ratios: Vec<Vec<f64>> = (0..policy_names.len())
                .map(|i| policy_stats.policy_ratio_timeline(i, trace_start_us, trace_end_us))
                .collect();
            reporter.write_policy_timeline(cache_type, cache_size, cf, time_unit_secs, start_bucket, policy_names, &counts)?;
            reporter.write_policy_ratio_timeline(cache_type, cache_size, cf, time_unit_secs, start_bucket, policy_names, &ratios)?;
        }
    }

    Ok(())
}

/// Writes the report files named `data-ml-{metric}-{time_unit}-{cache_type}-
/// {cache_size}-{cf}` with a paired `header-ml-*` file per spec.md §6.
/// `time_unit` is omitted (replaced with `summary`) for `mrc`, which is a
/// single point-in-time row rather than a timeline. Every data row leads
/// with a label column (`cache_type` or `cache_type-policy_name`) so the
/// file reads standalone; headers are rewritten on every run rather than
/// preserved across invocations, since one run produces one self-contained
/// report directory rather than appending to a shared one.
struct FileReporter {
    result_dir: PathBuf,
}

impl FileReporter {
    fn new(result_dir: PathBuf) -> Self {
        FileReporter { result_dir }
    }

    fn data_path(&self, metric: &str, time_unit: &str, cache_type: &str, cache_size: u64, cf: &str) -> PathBuf {
        self.result_dir
            .join(format!("data-ml-{metric}-{time_unit}-{cache_type}-{cache_size}-{cf}"))
    }

    fn header_path(&self, metric: &str, time_unit: &str, cache_type: &str, cache_size: u64, cf: &str) -> PathBuf {
        self.result_dir
            .join(format!("header-ml-{metric}-{time_unit}-{cache_type}-{cache_size}-{cf}"))
    }

    fn write_pair(&self, data_path: &Path, header_path: &Path, header: &str, data: &str) -> Result<(), Error> {
        let mut header_file = File::create(header_path)?;
        writeln!(header_file, "{header}")?;
        let mut data_file = File::create(data_path)?;
        writeln!(data_file, "{data}")?;
        debug!(path = %data_path.display(), "wrote report file");
        Ok(())
    }
}

impl Reporter for FileReporter {
    fn write_mrc(&mut self, cache_type: &str, cache_size: u64, cf: &str, miss_ratio: f64, accesses: u64) -> Result<(), Error> {
        let data = self.data_path("mrc", "summary", cache_type, cache_size, cf);
        let header = self.header_path("mrc", "summary", cache_type, cache_size, cf);
        self.write_pair(
            &data,
            &header,
            "cache_type,cache_size,cf,miss_ratio,accesses",
            &format!("{cache_type},{cache_size},{cf},{miss_ratio},{accesses}"),
        )
    }

    fn write_miss_timeline(
        &mut self,
        cache_type: &str,
        cache_size: u64,
        cf: &str,
        time_unit_secs: i64,
        start_bucket: i64,
        timeline: &[u64],
    ) -> Result<(), Error> {
        let time_unit = time_unit_secs.to_string();
        let data = self.data_path("miss-timeline", &time_unit, cache_type, cache_size, cf);
        let header = self.header_path("miss-timeline", &time_unit, cache_type, cache_size, cf);
        let row = format!("{cache_type},{}", join(timeline));
        self.write_pair(&data, &header, &bucket_header(start_bucket, timeline.len()), &row)
    }

    fn write_miss_ratio_timeline(
        &mut self,
        cache_type: &str,
        cache_size: u64,
        cf: &str,
        time_unit_secs: i64,
        start_bucket: i64,
        timeline: &[f64],
    ) -> Result<(), Error> {
        let time_unit = time_unit_secs.to_string();
        let data = self.data_path("miss-ratio-timeline", &time_unit, cache_type, cache_size, cf);
        let header = self.header_path("miss-ratio-timeline", &time_unit, cache_type, cache_size, cf);
        let row = format!("{cache_type},{}", join(timeline));
        self.write_pair(&data, &header, &bucket_header(start_bucket, timeline.len()), &row)
    }

    fn write_policy_timeline(
        &mut self,
        cache_type: &str,
        cache_size: u64,
        cf: &str,
        time_unit_secs: i64,
        start_bucket: i64,
        policy_names: &[&str],
        timelines: &[Vec<u64>],
    ) -> Result<(), Error> {
        let time_unit = time_unit_secs.to_string();
        let data = self.data_path("policy-timeline", &time_unit, cache_type, cache_size, cf);
        let header = self.header_path("policy-timeline", &time_unit, cache_type, cache_size, cf);
        let bucket_count = timelines.first().map(Vec::len).unwrap_or(0);
        let rows: Vec<String> = policy_names
            .iter()
            .zip(timelines)
            .map(|(name, series)| format!("{cache_type}-{name},{}", join(series)))
            .collect();
        self.write_pair(&data, &header, &bucket_header(start_bucket, bucket_count), &rows.join("\n"))
    }

    fn write_policy_ratio_timeline(
        &mut self,
        cache_type: &str,
        cache_size: u64,
        cf: &str,
        time_unit_secs: i64,
        start_bucket: i64,
        policy_names: &[&str],
        timelines: &[Vec<f64>],
    ) -> Result<(), Error> {
        let time_unit = time_unit_secs.to_string();
        let data = self.data_path("policy-ratio-timeline", &time_unit, cache_type, cache_size, cf);
        let header = self.header_path("policy-ratio-timeline", &time_unit, cache_type, cache_size, cf);
        let bucket_count = timelines.first().map(Vec::len).unwrap_or(0);
        let rows: Vec<String> = policy_names
            .iter()
            .zip(timelines)
            .map(|(name, series)| format!("{cache_type}-{name},{}", join(series)))
            .collect();
        self.write_pair(&data, &header, &bucket_header(start_bucket, bucket_count), &rows.join("\n"))
    }
}

/// `bucket,<start>,<start+1>,...`: the leading label makes the header
/// self-describing without needing the paired data file's row label column.
fn bucket_header(start_bucket: i64, len: usize) -> String {
    let buckets = (start_bucket..start_bucket + len as i64)
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("bucket,{buckets}")
}

fn join<T: std::fmt::Display>(values: &[T]) -> String {
    values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_line() {
        let line = "1000,42,0,16384,3,default,1,7,1,0,9,99,128,1";
        let record = parse_trace_line(line, 1).unwrap();
        assert_eq!(record.access_time_us, 1000);
        assert_eq!(record.block_id, 42);
        assert_eq!(record.block_size, 16384);
        assert_eq!(record.cf_name, "default");
        assert!(record.no_insert);
        assert!(record.is_hit_observed);
    }

    #[test]
    fn rejects_wrong_field_count() {
        let err = parse_trace_line("1,2,3", 5).unwrap_err();
        match err {
            Error::TraceFormat { line, .. } => assert_eq!(line, 5),
            other => panic!("expected TraceFormat, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_integer_fields() {
        let line = "not_a_number,42,0,16384,3,default,1,7,1,0,9,99,128,1";
        assert!(parse_trace_line(line, 3).is_err());
    }

    #[test]
    fn load_trace_filters_by_cf_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.csv");
        std::fs::write(
            &path,
            "0,1,0,10,0,alpha,0,0,0,0,0,0,0,0\n1,2,0,10,0,beta,0,0,0,0,0,0,0,0\n",
        )
        .unwrap();
        let all = load_trace(&path, "all").unwrap();
        assert_eq!(all.len(), 2);
        let alpha_only = load_trace(&path, "alpha").unwrap();
        assert_eq!(alpha_only.len(), 1);
        assert_eq!(alpha_only[0].cf_name, "alpha");
    }

    #[test]
    fn load_trace_surfaces_the_offending_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.csv");
        std::fs::write(&path, "0,1,0,10,0,alpha,0,0,0,0,0,0,0,0\nbad-line\n").unwrap();
        let err = load_trace(&path, "all").unwrap_err();
        match err {
            Error::TraceFormat { line, .. } => assert_eq!(line, 2),
            other => panic!("expected TraceFormat, got {other:?}"),
        }
    }
}
