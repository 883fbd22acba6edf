use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pointflow_archive::{
    generate_archive, parse_associations, EntryMap, SynthConfig, Trajectory, ASSOCIATIONS_PATH,
    TRAJECTORY_PATH,
};
use pointflow_core::CameraProfile;
use pointflow_engine::{MirrorBuffers, Session, StepOutcome, DEFAULT_CAPACITY};
use pointflow_track::{ReplayConfig, ReplayTracker};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pointflow-cli")]
#[command(about = "Headless tooling for pointflow RGB-D archives")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index an archive and report what it contains
    Inspect {
        /// Dataset archive (tar)
        archive: PathBuf,

        /// Emit the report as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Replay an archive without a window, printing the trajectory it
    /// follows as TUM lines
    Run {
        /// Dataset archive (tar)
        archive: PathBuf,

        /// Camera profile: fr1, fr2, fr3, icl
        #[arg(short, long, default_value = "fr1")]
        profile: String,

        /// Point store capacity
        #[arg(long, default_value_t = DEFAULT_CAPACITY)]
        capacity: u32,

        /// Sample every Nth pixel in both axes
        #[arg(long, default_value = "4")]
        stride: u32,

        /// Suppress per-frame trajectory lines, show progress instead
        #[arg(short, long, default_value = "false")]
        quiet: bool,
    },

    /// Generate a synthetic dataset archive
    Synth {
        #[arg(short, long, default_value = "data/synth.tar")]
        output: PathBuf,
        #[arg(long, default_value = "30")]
        frames: u32,
        #[arg(long, default_value = "64")]
        width: u32,
        #[arg(long, default_value = "48")]
        height: u32,
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

#[derive(Clone, Debug, Serialize)]
struct ArchiveReport {
    bytes: usize,
    entries: usize,
    frames: usize,
    poses: usize,
    first_timestamp: Option<f64>,
    last_timestamp: Option<f64>,
    /// Files named in the association list but absent from the archive.
    missing: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { archive, json } => {
            let blob = std::fs::read(&archive)
                .with_context(|| format!("failed to read archive: {}", archive.display()))?;
            let index = EntryMap::build(&blob)?;

            let associations = if index.contains(ASSOCIATIONS_PATH) {
                parse_associations(index.slice(&blob, ASSOCIATIONS_PATH)?)?
            } else {
                Vec::new()
            };
            let trajectory = if index.contains(TRAJECTORY_PATH) {
                Trajectory::parse(index.slice(&blob, TRAJECTORY_PATH)?)?
            } else {
                Trajectory::default()
            };

            let mut missing = Vec::new();
            for assoc in &associations {
                for name in [&assoc.depth_path, &assoc.color_path] {
                    if !index.contains(name) {
                        missing.push(name.clone());
                    }
                }
            }

            let report = ArchiveReport {
                bytes: blob.len(),
                entries: index.len(),
                frames: associations.len(),
                poses: trajectory.len(),
                first_timestamp: associations.first().map(|a| a.depth_timestamp),
                last_timestamp: associations.last().map(|a| a.depth_timestamp),
                missing,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "Archive {} ({:.1} MB):",
                    archive.display(),
                    report.bytes as f64 / 1e6
                );
                println!("  entries: {}", report.entries);
                println!("  frames:  {}", report.frames);
                println!("  poses:   {}", report.poses);
                if let (Some(first), Some(last)) =
                    (report.first_timestamp, report.last_timestamp)
                {
                    println!("  span:    {:.6} - {:.6} s", first, last);
                }
                if !report.missing.is_empty() {
                    println!("  missing: {} referenced files", report.missing.len());
                    for name in &report.missing {
                        println!("    {name}");
                    }
                }
            }
        }

        Commands::Run {
            archive,
            profile,
            capacity,
            stride,
            quiet,
        } => {
            let blob = std::fs::read(&archive)
                .with_context(|| format!("failed to read archive: {}", archive.display()))?;
            let profile: CameraProfile = profile.parse()?;

            let tracker = ReplayTracker::new(ReplayConfig {
                stride,
                ..ReplayConfig::default()
            });
            let mut session = Session::new(Box::new(tracker), capacity);
            let frames = session.load(&blob, profile)?;

            let pb = if quiet {
                let steps = frames.saturating_sub(1).max(1) as u64;
                let pb = ProgressBar::new(steps);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("{spinner:.green} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({per_sec})")
                        .expect("template error"),
                );
                pb
            } else {
                ProgressBar::hidden()
            };

            let mut gpu = MirrorBuffers::new();
            while let StepOutcome::Stepped(report) = session.step(&mut gpu) {
                if let Some(descriptor) = report.descriptor {
                    if !quiet {
                        println!("{descriptor}");
                    }
                }
                pb.inc(1);
            }
            pb.finish_and_clear();

            let stats = session.stats();
            println!("# frames: {} ({} lost)", stats.frame_count, stats.frames_lost);
            println!(
                "# points: {} valid of {} ({} dropped)",
                stats.valid_points, stats.capacity, stats.dropped_points
            );
            println!(
                "# uploads: {} rebinds, {} range writes",
                stats.rebinds, stats.range_writes
            );
        }

        Commands::Synth {
            output,
            frames,
            width,
            height,
            seed,
        } => {
            let blob = generate_archive(&SynthConfig {
                frames,
                width,
                height,
                seed,
            })?;
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&output, &blob)
                .with_context(|| format!("failed to write archive: {}", output.display()))?;
            println!(
                "Generated {} frames -> {} ({:.1} KB)",
                frames,
                output.display(),
                blob.len() as f64 / 1e3
            );
        }
    }

    Ok(())
}
