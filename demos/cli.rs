//! Command-line interface for plate_scan
//!
//! Detects license plates in one image and prints the candidates as JSON

use plate_scan::{detect_plates, detect_plates_debug, DetectionContext, ParameterSet};
use std::{
    env,
    path::{Path, PathBuf},
    process,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    let mut debug_output_dir = None;
    let mut params_path = None;
    let mut cascade_path = None;
    let mut image_path_arg = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--debug" => {
                // Optional directory operand, unless the next arg is the image
                match args.get(i + 1) {
                    Some(next) if !next.starts_with("--") && !looks_like_image(next) => {
                        debug_output_dir = Some(PathBuf::from(next));
                        i += 1;
                    }
                    _ => debug_output_dir = Some(PathBuf::from("debug")),
                }
            }
            "--params" | "--cascade" => {
                let Some(value) = args.get(i + 1) else {
                    eprintln!("Error: {} requires a file path", args[i]);
                    process::exit(1);
                };
                if args[i] == "--params" {
                    params_path = Some(PathBuf::from(value));
                } else {
                    cascade_path = Some(PathBuf::from(value));
                }
                i += 1;
            }
            "--help" | "-h" => {
                print_help(&args[0]);
                process::exit(0);
            }
            arg if !arg.starts_with("--") => {
                if image_path_arg.is_none() {
                    image_path_arg = Some(arg.to_string());
                } else {
                    eprintln!("Error: Multiple image paths provided");
                    process::exit(1);
                }
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                eprintln!("Use --help for usage information");
                process::exit(1);
            }
        }
        i += 1;
    }

    let Some(image_path_str) = image_path_arg else {
        print_help(&args[0]);
        process::exit(1);
    };
    let image_path = Path::new(&image_path_str);

    if !image_path.exists() {
        eprintln!("Error: File '{}' does not exist", image_path.display());
        process::exit(1);
    }

    let params = match &params_path {
        Some(path) => match ParameterSet::from_json_file(path) {
            Ok(params) => params,
            Err(e) => {
                eprintln!("Error loading parameters: {}", e);
                process::exit(1);
            }
        },
        None => ParameterSet::default(),
    };

    let result = match &debug_output_dir {
        Some(dir) => detect_plates_debug(image_path, params, cascade_path.as_deref(), dir).map(
            |(context, written)| {
                for path in &written {
                    eprintln!("Debug: Saved {}", path.display());
                }
                context
            },
        ),
        None => detect_plates(image_path, params, cascade_path.as_deref()),
    };

    match result {
        Ok(context) => print_result(&context),
        Err(error) => {
            eprintln!("Detection failed: {}", error);
            if error.is_recoverable() {
                eprintln!("Suggestion: {}", error.user_message());
            }
            process::exit(1);
        }
    }
}

fn looks_like_image(arg: &str) -> bool {
    Path::new(arg)
        .extension()
        .and_then(|e| e.to_str())
        .map(plate_scan::image_loader::is_supported_extension)
        .unwrap_or(false)
}

fn print_help(program_name: &str) {
    eprintln!("Usage: {} [OPTIONS] <image_path>", program_name);
    eprintln!();
    eprintln!("Locate license plates in an image file.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --debug [DIR]      Save preprocessing stages and an annotated overlay");
    eprintln!("                     Optional: specify output directory (default: debug/)");
    eprintln!("  --params FILE      Load detection parameters from a JSON file");
    eprintln!("  --cascade FILE     Cascade classifier XML (cascade detection is skipped without it)");
    eprintln!("  --help, -h         Show this help message");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  RUST_LOG=debug     Show per-stage detection logging");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} car.jpg", program_name);
    eprintln!("  {} --cascade haarcascade_russian_plate_number.xml car.jpg", program_name);
    eprintln!("  {} --debug output/ --params tuned.json car.png", program_name);
}

fn print_result(context: &DetectionContext) {
    let stats = context.stats();
    let output = serde_json::json!({
        "stats": stats,
        "candidates": context.summaries(),
    });

    // JSON to stdout for programmatic use
    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing result: {}", e),
    }

    // Summary to stderr for human reading
    eprintln!();
    eprintln!("Detection Summary:");
    eprintln!("  {}", stats);
    for candidate in &context.candidates {
        let marker = if context.is_high_confidence(candidate) {
            " (high confidence)"
        } else {
            ""
        };
        eprintln!(
            "  {:<18} {}x{} at ({}, {}){}",
            candidate.method.display_name(),
            candidate.bounds.width,
            candidate.bounds.height,
            candidate.bounds.x,
            candidate.bounds.y,
            marker
        );
    }

    if context.is_empty() {
        eprintln!("  No plate found. Consider adjusting the aspect-ratio band or Canny thresholds.");
    }
}
