use std::path::PathBuf;

use pcd_pipeline::{assemble, discover, PipelineConfig};

fn main() {
    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("input/rehab"));
    let output = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("output/lidar_combined.laz"));

    let config = PipelineConfig::new(input, output);
    let discovery = discover(&config).unwrap();
    let job = assemble(&discovery, &config).unwrap();

    println!("{}", job.to_json_pretty().unwrap());
}
