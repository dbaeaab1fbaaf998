//! Synthetic single-read containers shaped like basecalled nanopore reads.
//!
//! The reads carry a raw signal, an event detection table, and a basecall
//! analysis whose event table was derived from it. Logs, configuration,
//! FASTQ and summaries are included too, so every transform has something to
//! act on.

use std::path::{Path, PathBuf};

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::container::{
    write_tree, AttrValue, Column, Compression, ContainerError, Dataset, DatasetValue, Tree,
};

const BASES: [u8; 4] = *b"ACGT";

/// Shape of a synthetic read
#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub read_number: u32,
    pub events: usize,
    pub sampling_rate: f64,
    /// Chance that the basecaller drops an event detection row
    pub skip_probability: f64,
    pub seed: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            read_number: 1,
            events: 400,
            sampling_rate: 4000.0,
            skip_probability: 0.1,
            seed: 42,
        }
    }
}

fn dataset(value: DatasetValue) -> Dataset {
    Dataset::new(value, Compression::fast())
}

fn kmer(rng: &mut StdRng) -> Vec<u8> {
    (0..5).map(|_| BASES[rng.gen_range(0..4)]).collect()
}

/// Build one synthetic read
pub fn synthetic_read(config: &DemoConfig) -> Result<Tree, ContainerError> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut tree = Tree::new();
    let read = format!("Read_{}", config.read_number);
    let read_id = format!("{:08x}-demo-{:04}", rng.gen::<u32>(), config.read_number);

    tree.set_attr("/", "file_version", AttrValue::float(1.0))?;

    tree.create_group("/UniqueGlobalKey/channel_id")?;
    let channel = "/UniqueGlobalKey/channel_id";
    tree.set_attr(channel, "channel_number", AttrValue::string(rng.gen_range(1..513u32).to_string()))?;
    tree.set_attr(channel, "digitisation", AttrValue::float(8192.0))?;
    tree.set_attr(channel, "offset", AttrValue::float(6.0))?;
    tree.set_attr(channel, "range", AttrValue::float(1467.61))?;
    tree.set_attr(channel, "sampling_rate", AttrValue::float(config.sampling_rate))?;
    tree.create_group("/UniqueGlobalKey/tracking_id")?;
    tree.set_attr("/UniqueGlobalKey/tracking_id", "run_id", AttrValue::string("d6e473a6d513ec6bfc150c60fd4556d72f0e6d52"))?;
    tree.set_attr("/UniqueGlobalKey/tracking_id", "flow_cell_id", AttrValue::string("FAH12345"))?;
    tree.create_group("/UniqueGlobalKey/context_tags")?;
    tree.set_attr("/UniqueGlobalKey/context_tags", "experiment_kit", AttrValue::string("genomic_dna"))?;

    // event detection: contiguous events over the raw signal
    let first_sample: u64 = rng.gen_range(10_000..1_000_000);
    let mut starts = Vec::with_capacity(config.events);
    let mut lengths = Vec::with_capacity(config.events);
    let mut means = Vec::with_capacity(config.events);
    let mut stdvs = Vec::with_capacity(config.events);
    let mut cursor = first_sample;
    for _ in 0..config.events {
        let length: u64 = rng.gen_range(3..20);
        starts.push(cursor);
        lengths.push(length);
        means.push(rng.gen_range(60.0..120.0));
        stdvs.push(rng.gen_range(0.5..4.0));
        cursor += length;
    }
    let samples = (cursor - first_sample) as usize;

    let signal: Vec<i16> = (0..samples).map(|_| rng.gen_range(300..900)).collect();
    let raw_read = format!("/Raw/Reads/{}", read);
    tree.create_dataset(&format!("{}/Signal", raw_read), dataset(DatasetValue::single(Column::I16(signal))))?;
    tree.set_attr(&raw_read, "read_number", AttrValue::int(config.read_number as i64))?;
    tree.set_attr(&raw_read, "read_id", AttrValue::string(&read_id))?;
    tree.set_attr(&raw_read, "start_time", AttrValue::uint(first_sample))?;
    tree.set_attr(&raw_read, "duration", AttrValue::uint(samples as u64))?;
    tree.set_attr(&raw_read, "start_mux", AttrValue::int(1))?;
    tree.set_attr(&raw_read, "median_before", AttrValue::float(rng.gen_range(180.0..260.0)))?;

    let detection_group = "/Analyses/EventDetection_000";
    tree.create_group(detection_group)?;
    tree.set_attr(detection_group, "name", AttrValue::string("MinKNOW Event Detection"))?;
    tree.set_attr(detection_group, "version", AttrValue::string("1.7.3"))?;
    let detection_read = format!("{}/Reads/{}", detection_group, read);
    tree.create_dataset(
        &format!("{}/Events", detection_read),
        dataset(DatasetValue::compound([
            ("start", Column::U64(starts.clone())),
            ("length", Column::U64(lengths.clone())),
            ("mean", Column::F64(means.clone())),
            ("stdv", Column::F64(stdvs.clone())),
        ])?),
    )?;
    tree.set_attr(&detection_read, "read_number", AttrValue::int(config.read_number as i64))?;
    tree.set_attr(&detection_read, "start_time", AttrValue::uint(first_sample))?;
    tree.set_attr(&detection_read, "read_id", AttrValue::string(&read_id))?;

    // basecall: a subset of the detected events, start and length in seconds
    let rate = config.sampling_rate;
    let kept: Vec<usize> = (0..config.events)
        .filter(|_| !rng.gen_bool(config.skip_probability))
        .collect();
    let basecall_group = "/Analyses/Basecall_1D_000";
    tree.create_group(basecall_group)?;
    tree.set_attr(basecall_group, "name", AttrValue::string("ONT Albacore Sequencing Software"))?;
    tree.set_attr(basecall_group, "version", AttrValue::string("1.2.1"))?;
    tree.set_attr(basecall_group, "event_detection", AttrValue::string("Analyses/EventDetection_000"))?;

    let states: Vec<Vec<u8>> = kept.iter().map(|_| kmer(&mut rng)).collect();
    let moves: Vec<i64> = kept
        .iter()
        .enumerate()
        .map(|(i, _)| if i == 0 { 0 } else { rng.gen_range(0..3) })
        .collect();
    let template = format!("{}/BaseCalled_template", basecall_group);
    tree.create_dataset(
        &format!("{}/Events", template),
        dataset(DatasetValue::compound([
            ("mean", Column::F64(kept.iter().map(|&r| means[r]).collect())),
            ("start", Column::F64(kept.iter().map(|&r| starts[r] as f64 / rate).collect())),
            ("stdv", Column::F64(kept.iter().map(|&r| stdvs[r]).collect())),
            ("length", Column::F64(kept.iter().map(|&r| lengths[r] as f64 / rate).collect())),
            ("model_state", Column::strings(states.iter())),
            ("move", Column::I64(moves)),
            ("weights", Column::F64(kept.iter().map(|_| rng.gen_range(0.0..1.0)).collect())),
            ("p_model_state", Column::F64(kept.iter().map(|_| rng.gen_range(0.0..1.0)).collect())),
        ])?),
    )?;
    tree.set_attr(&template, "duration", AttrValue::uint(samples as u64))?;

    let sequence: String = (0..kept.len() / 2)
        .map(|_| BASES[rng.gen_range(0..4)] as char)
        .collect();
    let quality: String = sequence.chars().map(|_| (b'!' + rng.gen_range(5..30u8)) as char).collect();
    let fastq = format!("@{}\n{}\n+\n{}\n", read_id, sequence, quality);
    tree.create_dataset(
        &format!("{}/Fastq", template),
        dataset(DatasetValue::single(Column::strings([fastq]))),
    )?;
    tree.create_dataset(
        &format!("{}/Log", basecall_group),
        dataset(DatasetValue::single(Column::strings([
            "Basecalling started\nLoaded model r94_450bps\nBasecalling finished",
        ]))),
    )?;

    let summary = format!("{}/Summary/basecall_1d_template", basecall_group);
    tree.create_group(&summary)?;
    tree.set_attr(&summary, "called_events", AttrValue::uint(kept.len() as u64))?;
    tree.set_attr(&summary, "mean_qscore", AttrValue::float(rng.gen_range(7.0..14.0)))?;
    tree.set_attr(&summary, "sequence_length", AttrValue::uint(sequence.len() as u64))?;

    let configuration = format!("{}/Configuration", basecall_group);
    tree.create_group(&format!("{}/general", configuration))?;
    tree.set_attr(&format!("{}/general", configuration), "model_type", AttrValue::string("flipflop"))?;
    tree.create_group(&format!("{}/calibration_strand", configuration))?;

    Ok(tree)
}

/// Write `count` synthetic reads into `dir` as `read_NNNN.fast5`
pub fn write_synthetic_reads(dir: &Path, count: usize, seed: u64) -> Result<Vec<PathBuf>, ContainerError> {
    std::fs::create_dir_all(dir)?;
    let mut paths = Vec::with_capacity(count);
    for i in 0..count {
        let config = DemoConfig {
            read_number: i as u32 + 1,
            seed: seed.wrapping_add(i as u64),
            ..DemoConfig::default()
        };
        let path = dir.join(format!("read_{:04}.fast5", i + 1));
        write_tree(&synthetic_read(&config)?, &path)?;
        paths.push(path);
    }
    info!("Wrote {} synthetic reads to {}", count, dir.display());
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_layout() {
        let tree = synthetic_read(&DemoConfig::default()).unwrap();
        assert!(tree.is_dataset("/Raw/Reads/Read_1/Signal"));
        assert!(tree.is_dataset("/Analyses/EventDetection_000/Reads/Read_1/Events"));
        assert!(tree.is_dataset("/Analyses/Basecall_1D_000/BaseCalled_template/Events"));
        assert!(tree.is_dataset("/Analyses/Basecall_1D_000/BaseCalled_template/Fastq"));
        assert!(tree.is_group("/Analyses/Basecall_1D_000/Configuration/calibration_strand"));
        assert_eq!(
            tree.attr("/UniqueGlobalKey/channel_id", "sampling_rate").and_then(AttrValue::as_f64),
            Some(4000.0)
        );
    }

    #[test]
    fn test_seed_is_deterministic() {
        let config = DemoConfig {
            events: 50,
            ..DemoConfig::default()
        };
        let a = synthetic_read(&config).unwrap();
        let b = synthetic_read(&config).unwrap();
        let path = "/Analyses/Basecall_1D_000/BaseCalled_template/Events";
        assert_eq!(a.dataset(path), b.dataset(path));
    }
}
