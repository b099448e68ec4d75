use clap::Parser;
use depth_arm_tracker::config::PipelineConfig;
use depth_arm_tracker::frame_source::{DirectorySource, FrameSource};
use depth_arm_tracker::io::{object_from_json, object_to_json, write_report};
use depth_arm_tracker::pipeline::Pipeline;
use indicatif::ProgressBar;
use std::time::Instant;
use time::OffsetDateTime;

#[derive(Parser)]
#[command(version, about, author)]
struct ArmTrackerCli {
    /// path to a folder of 16-bit png depth frames
    path: String,

    /// pipeline config json, defaults are used when absent
    #[arg(short, long)]
    config: Option<String>,

    /// output json, defaults to arm_tracking_<local time>.json
    #[arg(short, long)]
    output: Option<String>,

    /// also write a plain text summary next to the output
    #[arg(long)]
    report: bool,
}

fn default_output_name() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    format!(
        "arm_tracking_{:04}{:02}{:02}_{:02}{:02}{:02}.json",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    depth_arm_tracker::init_logging();
    let cli = ArmTrackerCli::parse();

    let config: PipelineConfig = match &cli.config {
        Some(path) => object_from_json(path)?,
        None => PipelineConfig::default(),
    };
    let mut source = DirectorySource::open(&cli.path, config.depth_scale, config.intrinsics)?;
    let mut pipeline = Pipeline::new(config)?;

    let progress = ProgressBar::new(source.remaining().unwrap_or(0) as u64);
    let now = Instant::now();
    let estimates = pipeline.run(&mut source, |_| progress.inc(1))?;
    progress.finish();
    let duration_sec = now.elapsed().as_secs_f64();
    println!("tracking took {:.6} sec", duration_sec);
    if !estimates.is_empty() {
        println!("avg: {:.6} sec", duration_sec / estimates.len() as f64);
    }

    let output = cli.output.unwrap_or_else(default_output_name);
    object_to_json(&output, &estimates)?;
    println!("wrote {} frames to {}", estimates.len(), output);
    if cli.report {
        let report_path = format!("{}.txt", output.trim_end_matches(".json"));
        write_report(&report_path, &estimates)?;
        println!("report: {}", report_path);
    }
    Ok(())
}
