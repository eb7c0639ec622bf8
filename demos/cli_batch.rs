//! Batch CLI for plate_scan
//!
//! Runs one detection engine over every image in a directory, saving
//! preprocessing stages, an annotated overlay and a JSON summary per image

use opencv::core::Mat;
use plate_scan::{
    annotate::draw_detections, image_loader, DetectionContext, DetectionEngine, OverlayLayers,
    ParameterSet,
};
use std::{
    env, fs,
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

    if args.len() < 3 {
        print_help(&args[0]);
        process::exit(1);
    }

    let input_path = Path::new(&args[1]);
    let output_path = Path::new(&args[2]);

    let params = match args.get(3) {
        Some(path) => match ParameterSet::from_json_file(Path::new(path)) {
            Ok(params) => {
                eprintln!("Loaded parameters from {}", path);
                params
            }
            Err(e) => {
                eprintln!("Error loading parameter file: {}", e);
                process::exit(1);
            }
        },
        None => ParameterSet::default(),
    };

    let engine = match args.get(4) {
        Some(model) => DetectionEngine::with_cascade(params, Path::new(model)),
        None => DetectionEngine::new(params),
    };
    let mut engine = match engine {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error creating detection engine: {}", e);
            process::exit(1);
        }
    };

    if !engine.has_cascade() {
        eprintln!("Cascade detection disabled; running geometric detection only");
    }

    if let Err(e) = fs::create_dir_all(output_path) {
        eprintln!("Error creating output directory: {}", e);
        process::exit(1);
    }

    let image_files = match find_image_files(input_path) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Error finding image files: {}", e);
            process::exit(1);
        }
    };

    if image_files.is_empty() {
        eprintln!("No image files found in {}", input_path.display());
        process::exit(1);
    }

    eprintln!("Found {} image files to process", image_files.len());
    eprintln!();

    let mut found_count = 0;
    let mut empty_count = 0;
    let mut error_count = 0;

    for (i, image_path) in image_files.iter().enumerate() {
        let filename = image_path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown");

        eprint!("[{}/{}] Processing {}... ", i + 1, image_files.len(), filename);

        let image = match image_loader::load_image(image_path) {
            Ok(image) => image,
            Err(error) => {
                eprintln!("✗ {}", error);
                error_count += 1;
                continue;
            }
        };

        match engine.detect_all(&image) {
            Ok(context) => {
                let base_name = image_path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("output");

                if let Err(e) = save_outputs(&image, &context, output_path, base_name) {
                    eprintln!("Warning saving artifacts: {}", e);
                }

                if context.is_empty() {
                    eprintln!("no plate");
                    empty_count += 1;
                } else {
                    eprintln!("✓ {}", context.stats());
                    found_count += 1;
                }
            }
            Err(error) => {
                eprintln!("✗ {}", error);
                error_count += 1;
            }
        }
    }

    eprintln!();
    eprintln!("Batch processing complete:");
    eprintln!("  Plates found: {}", found_count);
    eprintln!("  No plate: {}", empty_count);
    eprintln!("  Errors: {}", error_count);
    eprintln!("  Artifacts saved to: {}", output_path.display());

    if error_count > 0 {
        process::exit(1);
    }
}

fn print_help(program_name: &str) {
    eprintln!(
        "Usage: {} <input> <output_dir> [params.json] [cascade.xml]",
        program_name
    );
    eprintln!();
    eprintln!("Batch-detect license plates in a directory of images.");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  input          Image file or directory of images");
    eprintln!("  output_dir     Where stage images, overlays and summaries are written");
    eprintln!("  params.json    Detection parameters (default parameters if omitted)");
    eprintln!("  cascade.xml    Cascade classifier model (geometric only if omitted)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  RUST_LOG=info  Print per-pass detection counts");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} photos/ results/", program_name);
    eprintln!("  {} photos/ results/ tuned.json plates.xml", program_name);
}

fn find_image_files(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    if dir.is_file() {
        return Ok(vec![dir.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .map(image_loader::is_supported_extension)
            .unwrap_or(false);
        if path.is_file() && supported {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn save_outputs(
    image: &Mat,
    context: &DetectionContext,
    output_dir: &Path,
    base_name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    use opencv::core::Vector;
    use opencv::imgcodecs;

    if let Some(artifacts) = &context.artifacts {
        artifacts.save_to_dir(output_dir, base_name)?;
    }

    let overlay = draw_detections(image, context, OverlayLayers::default())?;
    let overlay_path = output_dir.join(format!("{}_detections.png", base_name));
    imgcodecs::imwrite(
        overlay_path.to_str().ok_or("Invalid path")?,
        &overlay,
        &Vector::new(),
    )?;

    for (index, candidate) in context.candidates.iter().enumerate() {
        if let Some(crop) = &candidate.cropped_image {
            let crop_path = output_dir.join(format!(
                "{}_plate{}_{}.png",
                base_name,
                index,
                candidate.method.short_label()
            ));
            imgcodecs::imwrite(crop_path.to_str().ok_or("Invalid path")?, crop, &Vector::new())?;
        }
    }

    let summary = serde_json::json!({
        "stats": context.stats(),
        "candidates": context.summaries(),
    });
    let summary_path = output_dir.join(format!("{}_summary.json", base_name));
    fs::write(summary_path, serde_json::to_string_pretty(&summary)?)?;

    Ok(())
}
