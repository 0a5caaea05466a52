// Cantus Harp — CLI entry point.
//
// Generates a Sacred-Harp-style homophonic piece over the Villulia
// structure and prints every viewpoint plus the lyric alignment of the
// ornamented tenor line.
//
// Usage:
//   cargo run -p cantus_harp --bin generate -- [--mode major|minor]
//     [--ternary] [--seed N] [--dump]

use cantus_harp::model::{homophonic_model, voice_vp};
use cantus_harp::Voice;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mode = parse_flag(&args, "--mode").unwrap_or_else(|| "minor".to_string());
    let seed: Option<u64> = parse_flag(&args, "--seed");
    let ternary = args.iter().any(|a| a == "--ternary");
    let dump = args.iter().any(|a| a == "--dump");

    if mode != "major" && mode != "minor" {
        eprintln!("Unknown mode '{mode}'. Use major or minor.");
        std::process::exit(2);
    }

    println!("=== Cantus Harp Generator ===");
    println!("Mode: {mode}");
    println!("Meter: {}", if ternary { "6/8" } else { "4/4" });
    if let Some(s) = seed {
        println!("Seed: {s}");
    }
    println!();

    println!("[1/3] Building model (Villulia, 48 quarters)...");
    let mut model = match homophonic_model(&mode, ternary, seed) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("  Model configuration failed: {e}");
            std::process::exit(1);
        }
    };

    println!("[2/3] Generating viewpoints...");
    if let Err(e) = model.generate() {
        eprintln!("  Generation failed: {e}");
        std::process::exit(1);
    }

    println!("[3/3] Results");
    for name in ["lyr", "rhy", "chords"] {
        print_stream(&model, name);
    }
    for voice in Voice::ALL {
        print_stream(&model, voice_vp(voice));
    }
    print_stream(&model, "fill");

    match model.export_text("rhy", "fill", "lyr") {
        Ok(tokens) => println!("  text : {}", tokens.join(" ")),
        Err(e) => eprintln!("  text alignment failed: {e}"),
    }

    if dump {
        println!();
        println!("{}", model.dump());
    }
}

fn print_stream(model: &cantus_engine::Model, name: &str) {
    match model.content(name) {
        Ok(values) => {
            let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            println!("  {name:>6} ({:3}): {}", values.len(), items.join(" "));
        }
        Err(e) => eprintln!("  {name}: {e}"),
    }
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
