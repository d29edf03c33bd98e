//! gltf CLI - inspect and validate glTF 2.0 files.

use std::env;
use std::path::Path;
use std::process::ExitCode;

use gltf_import::document::Document;
use gltf_import::{Asset, Registry, Report};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const BUILD_DATE: &str = env!("GLTF_IMPORT_BUILD_DATE");

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    let mut filtered: Vec<&str> = Vec::new();
    let mut filter = "warn";
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => filter = "debug",
            "-vv" | "--trace" => filter = "trace",
            "-q" | "--quiet" => filter = "error",
            _ => filtered.push(arg),
        }
    }
    init_tracing(filter);

    if filtered.is_empty() {
        print_help();
        return ExitCode::SUCCESS;
    }

    match filtered[0] {
        "info" | "i" => {
            let Some(file) = filtered.get(1) else {
                eprintln!("Usage: gltf info <file.gltf|file.glb>");
                return ExitCode::FAILURE;
            };
            cmd_info(file)
        }
        "tree" | "t" => {
            let Some(file) = filtered.get(1) else {
                eprintln!("Usage: gltf tree <file.gltf|file.glb>");
                return ExitCode::FAILURE;
            };
            cmd_tree(file)
        }
        "validate" | "check" => {
            if filtered.len() < 2 {
                eprintln!("Usage: gltf validate <files...>");
                return ExitCode::FAILURE;
            }
            cmd_validate(&filtered[1..])
        }
        "version" | "--version" => {
            println!("gltf {VERSION} (built {BUILD_DATE})");
            ExitCode::SUCCESS
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_help();
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(filter: &str) {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let _ = fmt().with_env_filter(filter).without_time().try_init();
}

fn print_help() {
    println!("gltf {VERSION} - glTF 2.0 inspector");
    println!();
    println!("Usage: gltf [flags] <command> [args]");
    println!();
    println!("Commands:");
    println!("  info <file>          Show document summary");
    println!("  tree <file>          Show node hierarchy");
    println!("  validate <files...>  Import each file, report pass/fail");
    println!("  version              Show version");
    println!();
    println!("Flags:");
    println!("  -v, --verbose        Debug logging");
    println!("  -vv, --trace         Trace logging");
    println!("  -q, --quiet          Errors only");
}

fn cmd_info(file: &str) -> ExitCode {
    let asset = match Asset::open(file) {
        Ok(asset) => asset,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let doc = asset.document();

    println!("File: {file}");
    println!("Version: {}", doc.asset.version);
    if let Some(generator) = &doc.asset.generator {
        println!("Generator: {generator}");
    }
    println!("Scenes: {} (default: {:?})", doc.scenes.len(), doc.scene);
    println!("Nodes: {}", doc.nodes.len());
    println!("Meshes: {}", doc.meshes.len());
    println!("Materials: {}", doc.materials.len());
    println!("Textures: {}", doc.textures.len());
    println!("Accessors: {}", doc.accessors.len());
    println!(
        "Buffers: {} ({} bytes)",
        doc.buffers.len(),
        doc.buffers.iter().map(|b| b.byte_length).sum::<usize>()
    );
    println!("Skins: {}", doc.skins.len());
    println!("Animations: {}", doc.animations.len());
    println!("Cameras: {}", doc.cameras.len());
    println!("Lights: {}", asset.augment().lights.len());
    if !doc.extensions_used.is_empty() {
        println!("Extensions used: {}", doc.extensions_used.join(", "));
    }
    if !doc.extensions_required.is_empty() {
        println!("Extensions required: {}", doc.extensions_required.join(", "));
    }
    ExitCode::SUCCESS
}

fn cmd_tree(file: &str) -> ExitCode {
    let asset = match Asset::open(file) {
        Ok(asset) => asset,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let doc = asset.document();

    for (si, scene) in doc.scenes.iter().enumerate() {
        let name = scene.name.as_deref().unwrap_or("<unnamed>");
        println!("scene {si}: {name}");
        for &root in &scene.nodes {
            print_node(doc, root, 1);
        }
    }
    ExitCode::SUCCESS
}

fn print_node(doc: &Document, index: usize, depth: usize) {
    let node = &doc.nodes[index];
    let name = node.name.as_deref().unwrap_or("<unnamed>");
    let mut tags = Vec::new();
    if let Some(mesh) = node.mesh {
        tags.push(format!("mesh {mesh}"));
    }
    if let Some(camera) = node.camera {
        tags.push(format!("camera {camera}"));
    }
    if let Some(skin) = node.skin {
        tags.push(format!("skin {skin}"));
    }
    let tags = if tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", tags.join(", "))
    };
    println!("{}{index}: {name}{tags}", "  ".repeat(depth));
    for &child in &node.children {
        print_node(doc, child, depth + 1);
    }
}

fn cmd_validate(files: &[&str]) -> ExitCode {
    let files: Vec<&Path> = files.iter().map(Path::new).collect();
    let report = Report::run(files, &Registry::standard());
    println!("{report}");
    if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
