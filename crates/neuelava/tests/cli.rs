use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use image::{Rgba, RgbaImage};
use tempfile::TempDir;

struct Sandbox {
    root: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        for dir in ["config", "data/masks", "share"] {
            fs::create_dir_all(root.path().join(dir)).unwrap();
        }
        Self { root }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    fn write_mask(&self, relative: &str, width: u32, height: u32) -> PathBuf {
        let path = self.path(relative);
        RgbaImage::from_fn(width, height, |x, _| {
            let v = (x * 255 / width.max(1)) as u8;
            Rgba([v, v, v, 255])
        })
        .save(&path)
        .unwrap();
        path
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_neuelava"))
            .env("NEUELAVA_CONFIG_DIR", self.path("config"))
            .env("NEUELAVA_DATA_DIR", self.path("data"))
            .env("NEUELAVA_SHARE_DIR", self.path("share"))
            .env_remove("NEUELAVA_CONFIG")
            .env("RUST_LOG", "warn")
            .args(args)
            .output()
            .expect("failed to run neuelava")
    }
}

fn pngs_in(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("png"))
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[test]
fn export_writes_png_of_requested_size() {
    let sandbox = Sandbox::new();
    sandbox.write_mask("data/masks/mask-1.png", 32, 16);
    let out = sandbox.path("out");

    let output = sandbox.run(&[
        "export",
        "--size",
        "96",
        "--time",
        "2.0",
        "--output",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let files = pngs_in(&out);
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("neue-lava-"), "{name}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), files[0].display().to_string());

    let image = image::open(&files[0]).unwrap();
    assert_eq!((image.width(), image.height()), (96, 96));

    let state = fs::read_to_string(sandbox.path("config/state.toml")).unwrap();
    assert!(state.contains("last_export"));
}

#[test]
fn shape_export_needs_no_masks() {
    let sandbox = Sandbox::new();
    let out = sandbox.path("out");
    let output = sandbox.run(&[
        "export",
        "--variant",
        "shape",
        "--shape",
        "cube",
        "--size",
        "64",
        "--no-branding",
        "--output",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(pngs_in(&out).len(), 1);
}

#[test]
fn wrong_type_mask_fails_without_output() {
    let sandbox = Sandbox::new();
    let notes = sandbox.path("notes.txt");
    fs::write(&notes, "not an image").unwrap();
    let out = sandbox.path("out");

    let output = sandbox.run(&[
        "export",
        "--mask",
        notes.to_str().unwrap(),
        "--output",
        out.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unsupported"));
    assert!(pngs_in(&out).is_empty());
}

#[test]
fn oversize_mask_fails_without_output() {
    let sandbox = Sandbox::new();
    fs::write(
        sandbox.path("config/config.toml"),
        "version = 1\n[loading]\nmax_upload_bytes = 64\n",
    )
    .unwrap();
    let mask = sandbox.write_mask("big.png", 64, 64);
    assert!(fs::metadata(&mask).unwrap().len() > 64);
    let out = sandbox.path("out");

    let output = sandbox.run(&[
        "export",
        "--mask",
        mask.to_str().unwrap(),
        "--output",
        out.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(pngs_in(&out).is_empty());
}

#[test]
fn missing_bundled_mask_fails_export() {
    let sandbox = Sandbox::new();
    let out = sandbox.path("out");
    let output = sandbox.run(&["export", "--output", out.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(pngs_in(&out).is_empty());
}

#[test]
fn themes_lists_every_theme() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["themes"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["Original", "Muted", "Cool", "Warm"] {
        assert!(stdout.contains(name), "missing {name} in {stdout}");
    }
}

#[test]
fn params_json_reflects_overrides() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&[
        "params",
        "--json",
        "--theme",
        "warm",
        "--set",
        "glow_intensity=2.5",
        "--blend",
        "screen",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let document: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(document["theme"], "Warm");
    assert_eq!(document["blend"], "screen");
    assert_eq!(document["parameters"]["glow_intensity"], 2.5);
    assert_eq!(document["colors"]["color_blue"], "#1e1102");
}

#[test]
fn params_rejects_unknown_parameter() {
    let sandbox = Sandbox::new();
    let output = sandbox.run(&["params", "--set", "lava_heat=1"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("lava_heat"));
}

#[test]
fn masks_and_where_report_directories() {
    let sandbox = Sandbox::new();
    sandbox.write_mask("data/masks/mask-2.png", 4, 4);

    let output = sandbox.run(&["masks", "--mask-index", "2"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("*  2 present"), "{stdout}");
    assert!(stdout.contains("   1 missing"), "{stdout}");

    let output = sandbox.run(&["where"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(&sandbox.path("config").display().to_string()));
    assert!(stdout.contains(&sandbox.path("data/masks").display().to_string()));
}
