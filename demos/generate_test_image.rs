//! Generate a synthetic test image
//!
//! Writes a gray scene with a white, framed, lettered plate so the pipeline
//! can be exercised without real vehicle photographs

use plate_scan::synthetic::{write_skewed_plate_scene, PlateScene};
use std::{env, path::Path, process};

fn main() {
    let args: Vec<String> = env::args().collect();

    let skewed = args.iter().any(|a| a == "--skewed");
    let Some(output) = args.iter().skip(1).find(|a| !a.starts_with("--")) else {
        eprintln!("Usage: {} [--skewed] <output.png>", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  {} test_car.png", args[0]);
        process::exit(1);
    };
    let output_path = Path::new(output);

    let result = if skewed {
        write_skewed_plate_scene(output_path, 640, 480)
    } else {
        PlateScene::default().write_to(output_path)
    };

    match result {
        Ok(()) => eprintln!("Test image generated: {}", output_path.display()),
        Err(e) => {
            eprintln!("Failed to generate test image: {}", e);
            process::exit(1);
        }
    }
}
