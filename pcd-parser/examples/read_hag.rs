use std::path::PathBuf;

use pcd_core::pointcloud::point::HEIGHT_ABOVE_GROUND;
use pcd_parser::reader::{las::LasPointReader, PointIterator};

fn main() {
    let files: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if files.is_empty() {
        eprintln!("usage: read_hag FILE...");
        std::process::exit(2);
    }

    let reader = LasPointReader::new(files).with_dimension(HEIGHT_ABOVE_GROUND);

    let mut count = 0usize;
    let mut with_hag = 0usize;
    let mut max_hag = f64::MIN;
    for chunk in PointIterator::new(reader, 100_000) {
        let chunk = chunk.unwrap();
        count += chunk.len();
        for hag in chunk.iter().filter_map(|p| p.height_above_ground) {
            with_hag += 1;
            max_hag = max_hag.max(hag);
        }
    }

    println!("Number of points: {count}");
    println!("Points with {HEIGHT_ABOVE_GROUND}: {with_hag}");
    if with_hag > 0 {
        println!("Max {HEIGHT_ABOVE_GROUND}: {max_hag}");
    }
}
