//! Environment readiness check.

use anyhow::Result;

use reelscrape::config::{resolve_output_dir, CHROMIUM_PATH_ENV};
use reelscrape::find_chromium;

/// Report the platform, the Chromium binary in use, and the output directory.
pub fn run() -> Result<()> {
    println!("Reelscrape Doctor");
    println!("=================");
    println!();

    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    let chromium = find_chromium();
    match &chromium {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!(
            "[!!] Chromium NOT found. Install Chrome/Chromium or set {CHROMIUM_PATH_ENV}."
        ),
    }

    let output_dir = resolve_output_dir(None);
    if output_dir.is_dir() {
        println!("[OK] Output directory exists: {}", output_dir.display());
    } else {
        println!(
            "[..] Output directory will be created: {}",
            output_dir.display()
        );
    }

    println!();
    if chromium.is_some() {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}
