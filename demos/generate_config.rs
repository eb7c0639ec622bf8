//! Generate a default detection parameter file
//!
//! Creates a JSON file with every tunable parameter at its default value

use plate_scan::ParameterSet;
use std::{env, path::Path, process};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <output_params.json>", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  {} config/params.json", args[0]);
        process::exit(1);
    }

    let output_path = Path::new(&args[1]);

    if let Some(parent) = output_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("Error creating directory: {}", e);
            process::exit(1);
        }
    }

    let params = ParameterSet::default();

    match params.to_json_file(output_path) {
        Ok(_) => {
            eprintln!("Parameters saved to {}", output_path.display());
            eprintln!();
            eprintln!("Parameter summary:");
            eprintln!(
                "  Bilateral window: {}, Canny ({}, {})",
                params.blur_kernel, params.canny_threshold1, params.canny_threshold2
            );
            eprintln!(
                "  Dilation: {}x{} kernel, {} iteration(s)",
                params.dilate_kernel_size, params.dilate_kernel_size, params.dilate_iterations
            );
            eprintln!(
                "  Aspect ratio band: {:.1} - {:.1}",
                params.min_aspect_ratio, params.max_aspect_ratio
            );
            eprintln!(
                "  Cascade: scale factor {:.2}, min neighbors {}",
                params.haar_scale_factor, params.haar_min_neighbors
            );
        }
        Err(e) => {
            eprintln!("Error saving parameters: {}", e);
            process::exit(1);
        }
    }
}
