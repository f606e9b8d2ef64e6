//! Build script for checking system dependencies and model assets.
//!
//! `OpenCV` is found through pkg-config; ONNX Runtime is fetched by the `ort`
//! crate itself. Missing pieces only produce warnings with installation hints,
//! since the library half of the crate builds and tests without any of them.

use std::path::Path;
use std::process::Command;

/// Files the binary loads at startup, relative to the crate root
const MODEL_ASSETS: [&str; 3] = [
    "assets/deploy.prototxt",
    "assets/res10_300x300_ssd_iter_140000.caffemodel",
    "assets/face_landmarks.onnx",
];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=assets");

    let pkg_config = pkg_config_version();
    match &pkg_config {
        Some(version) => println!("cargo:warning=Found pkg-config version: {version}"),
        None => {
            println!("cargo:warning=pkg-config not found. This is required to find OpenCV.");
            println!("cargo:warning=On Ubuntu: sudo apt-get install pkg-config");
            println!("cargo:warning=On macOS: brew install pkg-config");
        }
    }

    if pkg_config.is_some() {
        check_opencv();
    }
    check_models();
}

fn pkg_config_version() -> Option<String> {
    let output = Command::new("pkg-config").arg("--version").output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn check_opencv() {
    println!("cargo:rerun-if-env-changed=PKG_CONFIG_PATH");
    println!("cargo:rerun-if-env-changed=OPENCV_LINK_PATHS");
    println!("cargo:rerun-if-env-changed=OPENCV_INCLUDE_PATHS");

    // opencv4 first, then the legacy package name
    let found = ["opencv4", "opencv"].iter().find_map(|package| {
        let output = Command::new("pkg-config").args(["--modversion", package]).output().ok()?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    });

    if let Some(version) = found {
        println!("cargo:warning=Found OpenCV version: {version}");
    } else {
        println!("cargo:warning=OpenCV not found via pkg-config.");
        println!("cargo:warning=The dnn, videoio and highgui modules are required.");
        println!("cargo:warning=On Ubuntu: sudo apt-get install libopencv-dev");
        println!("cargo:warning=On macOS: brew install opencv");
    }
}

fn check_models() {
    let missing: Vec<&str> = MODEL_ASSETS
        .iter()
        .copied()
        .filter(|path| !Path::new(path).exists())
        .collect();
    if !missing.is_empty() {
        println!("cargo:warning=Model files not found: {}", missing.join(", "));
        println!("cargo:warning=The binary loads them at runtime.");
        println!("cargo:warning=Paths can be changed in the YAML config.");
    }
}
