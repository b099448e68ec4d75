use clap::{Parser, Subcommand};
use depth_arm_tracker::config::{ArmConfig, PipelineConfig};
use depth_arm_tracker::frame_source::save_depth_png;
use depth_arm_tracker::io::object_to_json;
use depth_arm_tracker::synthetic::{ArmPose, SceneConfig, SceneGenerator};
use std::path::Path;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a folder of synthetic arm depth frames
    Generate {
        /// Output directory
        #[arg(short, long)]
        output: String,

        /// Number of frames to generate
        #[arg(short, long, default_value = "30")]
        num_frames: usize,

        /// Random seed for sensor noise
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// Hand sway amplitude in metres
        #[arg(long, default_value = "0.03")]
        sway: f32,

        /// Image width
        #[arg(long, default_value = "320")]
        width: u32,

        /// Image height
        #[arg(long, default_value = "240")]
        height: u32,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    depth_arm_tracker::init_logging();
    let args = Args::parse();

    match args.command {
        Commands::Generate {
            output,
            num_frames,
            seed,
            sway,
            width,
            height,
        } => {
            generate_frames(&output, num_frames, seed, sway, width, height)?;
        }
    }

    Ok(())
}

fn generate_frames(
    output_dir: &str,
    num_frames: usize,
    seed: u64,
    sway: f32,
    width: u32,
    height: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    use std::fs;

    let mut scene = SceneConfig::default();
    scene.intrinsics.width = width;
    scene.intrinsics.height = height;
    scene.intrinsics.ppx = width as f32 / 2.0;
    scene.intrinsics.ppy = height as f32 / 2.0;
    let mut generator = SceneGenerator::new(scene.clone(), seed);
    let pose = ArmPose::default();

    fs::create_dir_all(output_dir)?;
    for frame_idx in 0..num_frames {
        let phase = std::f32::consts::TAU * frame_idx as f32 / num_frames.max(1) as f32;
        let grid = generator.render(&pose.swayed(phase, sway))?;
        let filename = format!("frame_{:06}.png", frame_idx);
        save_depth_png(&grid, Path::new(output_dir).join(filename))?;
    }

    // A config the tracker can replay these frames with
    let config = PipelineConfig {
        depth_scale: scene.depth_scale,
        intrinsics: scene.intrinsics,
        arms: vec![ArmConfig {
            name: "right".to_string(),
            start_pos: [pose.hand[0], pose.hand[1], pose.hand[2] - 0.06],
            ..Default::default()
        }],
        ..Default::default()
    };
    object_to_json(Path::new(output_dir).join("config.json"), &config)?;
    object_to_json(Path::new(output_dir).join("scene.json"), &scene)?;

    println!("Generated {} frames in {}", num_frames, output_dir);
    Ok(())
}
