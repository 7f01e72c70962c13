use std::io::Write;
use std::path::PathBuf;

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use env_logger::Builder;
use log::LevelFilter;
use thiserror::Error;

use chm_metrics::{
    extract::read_manifest,
    growth_rates, rank,
    table::{read_csv, write_csv},
    GrowthFilter, MetricsConfig, MetricsError, SiteRecord,
};
use pcd_core::{
    pointcloud::point::{CLASS_GROUND, CLASS_MEDIUM_VEGETATION},
    tile::TileGrid,
};
use pcd_pipeline::{
    assemble, copc_job,
    config::{HagMethod, ProcessingMode},
    discover,
    discover::InputFormat,
    incremental::IncrementalMerge,
    run_job,
    runner::point_spacing,
    PdalCli, PipelineConfig, PipelineError,
};

#[derive(Parser, Debug)]
#[command(
    name = "rehab-lidar",
    about = "Assemble LiDAR merge pipelines and track canopy growth on rehabilitation sites",
    version = "0.0.1"
)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge survey tiles into one cloud, deriving height above ground for
    /// ground/non-ground deliveries
    Assemble(AssembleArgs),
    /// Merge tiles one file at a time
    MergeIncremental(MergeArgs),
    /// Canopy and stem statistics for every survey in a manifest
    SiteStats(SiteStatsArgs),
    /// Per-site growth rate of P90 canopy height
    Growth(GrowthArgs),
    /// Average point spacing of a point cloud
    Spacing(SpacingArgs),
}

#[derive(Args, Debug)]
struct TileArgs {
    /// Only take tiles whose name starts with a cell of the grid below
    #[arg(long)]
    tiles: bool,

    #[arg(long, default_value_t = 295000)]
    min_x: i64,

    #[arg(long, default_value_t = 297000)]
    max_x: i64,

    #[arg(long, default_value_t = 6425000)]
    min_y: i64,

    #[arg(long, default_value_t = 6428000)]
    max_y: i64,

    #[arg(long, default_value_t = 1000)]
    step: i64,

    #[arg(long, value_name = "PREFIX", default_value = "297000_6425000")]
    exclude: Vec<String>,
}

impl TileArgs {
    fn grid(&self) -> Result<Option<TileGrid>, PipelineError> {
        if !self.tiles {
            return Ok(None);
        }
        let grid = TileGrid::new(
            (self.min_x, self.max_x),
            (self.min_y, self.max_y),
            self.step,
            self.exclude.clone(),
        )?;
        let ((min_x, max_x), (min_y, max_y)) = grid.bounds();
        log::info!(
            "tile filter: x {}..={}, y {}..={} every {} m, {} cells, excluded {:?}",
            min_x,
            max_x,
            min_y,
            max_y,
            grid.step(),
            grid.included_prefixes().len(),
            grid.excluded_prefixes()
        );
        Ok(Some(grid))
    }
}

#[derive(Args, Debug)]
struct AssembleArgs {
    #[arg(short, long, value_name = "DIR")]
    input: PathBuf,

    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    #[arg(long, default_value = "auto")]
    mode: ProcessingMode,

    #[command(flatten)]
    tiles: TileArgs,

    #[arg(long, default_value_t = CLASS_MEDIUM_VEGETATION)]
    non_ground_class: u8,

    #[arg(long, default_value_t = CLASS_GROUND)]
    ground_class: u8,

    /// CRS of text coordinate files
    #[arg(long, default_value = "EPSG:7856")]
    srs: String,

    /// Column separator of text coordinate files
    #[arg(long)]
    separator: Option<String>,

    #[arg(long, default_value = "nn")]
    hag: HagMethod,

    /// Also write a cloud-optimised copy of the output
    #[arg(long, value_name = "FILE")]
    copc: Option<PathBuf>,

    /// Stream points through the engine when the job allows it
    #[arg(long)]
    stream: bool,

    /// Print the job instead of running it
    #[arg(long)]
    dry_run: bool,

    #[arg(long, default_value = "pdal")]
    pdal: PathBuf,
}

impl AssembleArgs {
    fn config(&self) -> Result<PipelineConfig, PipelineError> {
        let mut config = PipelineConfig::new(&self.input, &self.output).with_mode(self.mode);
        if let Some(grid) = self.tiles.grid()? {
            config = config.with_tile_grid(grid);
        }
        config.non_ground_class = self.non_ground_class;
        config.ground_class = self.ground_class;
        config.text_reader.spatial_reference = self.srs.clone();
        config.text_reader.separator = self.separator.clone();
        config.hag_method = self.hag;
        config.copc_output = self.copc.clone();
        Ok(config)
    }
}

#[derive(Args, Debug)]
struct MergeArgs {
    #[arg(short, long, value_name = "DIR")]
    input: PathBuf,

    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    #[command(flatten)]
    tiles: TileArgs,

    /// Load every point of each step instead of streaming
    #[arg(long)]
    no_stream: bool,

    #[arg(long, default_value = "pdal")]
    pdal: PathBuf,
}

#[derive(Args, Debug)]
struct SiteStatsArgs {
    /// CSV with short_id, date, chm, las and optional veg_type, rehab_year
    #[arg(short, long, value_name = "CSV")]
    manifest: PathBuf,

    #[arg(short, long, value_name = "CSV")]
    output: PathBuf,

    /// Stem density grid size in metres
    #[arg(long, default_value_t = 2.0)]
    grid: f64,
}

#[derive(Args, Debug)]
struct GrowthArgs {
    /// Site statistics written by `site-stats`
    #[arg(short, long, value_name = "CSV")]
    stats: PathBuf,

    #[arg(short, long, value_name = "CSV")]
    output: PathBuf,

    #[arg(long, default_value = "pasture")]
    exclude_veg_type: String,

    #[arg(long, default_value_t = 2021)]
    before_year: i32,

    #[arg(long, default_value_t = 10_000.0)]
    min_area: f64,

    /// Fit every site regardless of vegetation type, rehab year and area
    #[arg(long)]
    no_filter: bool,

    /// Keep every site, including missing and negative rates, unranked
    #[arg(long)]
    all: bool,
}

#[derive(Args, Debug)]
struct SpacingArgs {
    #[arg(value_name = "FILE")]
    file: PathBuf,

    #[arg(long, default_value = "pdal")]
    pdal: PathBuf,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

fn run_assemble(args: AssembleArgs) -> Result<(), AppError> {
    let config = args.config()?;
    log::info!("input: {:?}", config.input_root);
    log::info!("output: {:?}", config.output);

    let discovery = discover(&config)?;
    let job = assemble(&discovery, &config)?;
    let copc = match &config.copc_output {
        Some(copc) => Some(copc_job(&config.output, copc)?),
        None => None,
    };

    if args.dry_run {
        println!("{}", job.to_json_pretty()?);
        if let Some(copc) = &copc {
            println!("{}", copc.to_json_pretty()?);
        }
        return Ok(());
    }

    let executor = PdalCli::new(&args.pdal);
    run_job(&executor, &job, args.stream)?;
    if let Some(copc) = &copc {
        run_job(&executor, copc, args.stream)?;
    }
    Ok(())
}

fn run_merge(args: MergeArgs) -> Result<(), AppError> {
    let mut config = PipelineConfig::new(&args.input, &args.output).with_mode(ProcessingMode::Single);
    if let Some(grid) = args.tiles.grid()? {
        config = config.with_tile_grid(grid);
    }

    let discovery = discover(&config)?;
    if discovery.format != InputFormat::PointCloud {
        return Err(PipelineError::InvalidJob(
            "incremental merge reads LAS/LAZ files only".to_string(),
        )
        .into());
    }
    let files: Vec<PathBuf> = discovery.files.into_iter().map(|f| f.path).collect();

    let executor = PdalCli::new(&args.pdal);
    let report = IncrementalMerge::new(&args.output)
        .with_streaming(!args.no_stream)
        .run(&executor, &files)?;
    log::info!(
        "{} points in {:?} after {:?}",
        report.point_count,
        args.output,
        report.elapsed
    );
    Ok(())
}

fn run_site_stats(args: SiteStatsArgs) -> Result<(), AppError> {
    let config = MetricsConfig::default().with_stem_grid(args.grid)?;
    let rows = read_manifest(&args.manifest)?;
    let records = chm_metrics::extract(&rows, &config)?;
    write_csv(&args.output, &records)?;
    Ok(())
}

fn run_growth(args: GrowthArgs) -> Result<(), AppError> {
    let records: Vec<SiteRecord> = read_csv(&args.stats)?;
    let filter = if args.no_filter {
        GrowthFilter::none()
    } else {
        GrowthFilter {
            exclude_veg_type: Some(args.exclude_veg_type),
            before_year: Some(args.before_year),
            min_area_m2: Some(args.min_area),
        }
    };

    let rates = growth_rates(&records, &filter, &MetricsConfig::default());
    let rates = if args.all { rates } else { rank(&rates) };
    if let Some(fastest) = rates.first() {
        log::info!(
            "fastest growth: {} at {:.2} m/year",
            fastest.short_id,
            fastest.growth_rate_m_per_year
        );
    }
    write_csv(&args.output, &rates)?;
    Ok(())
}

fn run_spacing(args: SpacingArgs) -> Result<(), AppError> {
    let spacing = point_spacing(&PdalCli::new(&args.pdal), &args.file)?;
    println!("{:.2}", spacing.spacing);
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(
            None,
            if cli.verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            },
        )
        .parse_default_env()
        .init();

    let start = std::time::Instant::now();
    let result = match cli.command {
        Command::Assemble(args) => run_assemble(args),
        Command::MergeIncremental(args) => run_merge(args),
        Command::SiteStats(args) => run_site_stats(args),
        Command::Growth(args) => run_growth(args),
        Command::Spacing(args) => run_spacing(args),
    };

    match result {
        Ok(()) => log::info!("Elapsed: {:?}", start.elapsed()),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_defaults_follow_survey_conventions() {
        let cli = Cli::parse_from([
            "rehab-lidar",
            "assemble",
            "--input",
            "input/lidar/2024-07-29",
            "--output",
            "output/lidar_combined.laz",
            "--tiles",
        ]);
        let Command::Assemble(args) = cli.command else {
            panic!("expected assemble");
        };
        let config = args.config().unwrap();
        assert_eq!(config.mode, ProcessingMode::Auto);
        assert_eq!(config.non_ground_class, 4);
        let grid = config.tile_grid.unwrap();
        assert_eq!(grid.included_prefixes().len(), 11);
        assert!(!grid.matches("297000_6425000.las"));
    }

    #[test]
    fn mode_and_hag_parse_from_names() {
        let cli = Cli::parse_from([
            "rehab-lidar",
            "-v",
            "assemble",
            "-i",
            "in",
            "-o",
            "out.laz",
            "--mode",
            "separated",
            "--hag",
            "delaunay",
            "--dry-run",
        ]);
        assert!(cli.verbose);
        let Command::Assemble(args) = cli.command else {
            panic!("expected assemble");
        };
        assert_eq!(args.mode, ProcessingMode::Separated);
        assert_eq!(args.hag, HagMethod::Delaunay);
        assert!(args.dry_run);
        assert!(args.config().unwrap().tile_grid.is_none());

        assert!(Cli::try_parse_from(["rehab-lidar", "assemble", "-i", "in", "-o", "o", "--mode", "both"]).is_err());
    }

    #[test]
    fn invalid_tile_step_is_an_error() {
        let tiles = TileArgs {
            tiles: true,
            min_x: 0,
            max_x: 10,
            min_y: 0,
            max_y: 10,
            step: 0,
            exclude: vec![],
        };
        assert!(matches!(tiles.grid(), Err(PipelineError::TileGrid(_))));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
