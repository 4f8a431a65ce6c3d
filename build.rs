use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

fn main() {
    // Tell Cargo to rebuild if this build script changes
    println!("cargo:rerun-if-changed=build.rs");

    // Tell Cargo to rebuild if the secrets file changes
    println!("cargo:rerun-if-changed=secrets.txt");

    read_spotify_secrets();
}

/// Compile default Spotify application credentials from secrets.txt, if present
fn read_spotify_secrets() {
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => dir,
        Err(_) => return,
    };
    let secrets_path = Path::new(&manifest_dir).join("secrets.txt");

    if !secrets_path.exists() {
        println!("No secrets.txt file found, Spotify credentials must come from config or environment");
        return;
    }

    match File::open(&secrets_path) {
        Ok(file) => {
            let reader = BufReader::new(file);

            for line in reader.lines().map_while(Result::ok) {
                let line = line.trim();
                if line.is_empty() || line.starts_with("//") || line.starts_with('#') {
                    continue;
                }

                if let Some((key, value)) = line.split_once('=') {
                    match key.trim() {
                        "SPOTIFY_CLIENT_ID" => {
                            println!("cargo:rustc-env=QUEUESPLICE_DEFAULT_CLIENT_ID={}", value.trim());
                        },
                        "SPOTIFY_CLIENT_SECRET" => {
                            println!("cargo:rustc-env=QUEUESPLICE_DEFAULT_CLIENT_SECRET={}", value.trim());
                        },
                        _ => {} // Ignore other keys
                    }
                }
            }
        },
        Err(e) => {
            println!("Failed to open secrets.txt: {}", e);
        }
    }
}
