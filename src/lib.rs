pub mod ast;
pub mod codegen;
pub mod config;
pub mod error;
pub mod functions;
pub mod ids;
pub mod parser;
pub mod semantic;
pub mod verify;
pub mod xml;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;

use anyhow::{bail, Context, Result};
use codegen::{CompileMode, CompileOptions, CompileReport};
use config::{MappingConfig, Registry};
use ids::{IdGenerator, SequentialIds, UuidIds};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub use codegen::{compile_config, compile_config_with_ids, compile_functional_mapping};
pub use error::CompileError;

#[cfg(all(target_arch = "wasm32", feature = "wasm-bindings"))]
pub mod wasm;

#[cfg(not(target_arch = "wasm32"))]
pub fn run_cli(args: &cli::Args) -> Result<()> {
    if args.split && args.output.is_none() {
        bail!("--split requires an OUTPUT directory.");
    }

    let mut progress = CliProgress::new("Compile", 4 + usize::from(args.verify));

    progress.advance("Reading mapping config");
    let input = canonicalize_file(&args.input)?;
    let config: MappingConfig = read_json(&input)?;

    progress.advance("Loading registry");
    let registry = match &args.registry {
        Some(path) => read_json(&canonicalize_file(path)?)?,
        None => Registry::default(),
    };

    progress.advance("Compiling functional mappings");
    let options = CompileOptions {
        mode: if args.permissive {
            CompileMode::Permissive
        } else {
            CompileMode::Strict
        },
    };
    let mut ids: Box<dyn IdGenerator> = if args.sequential_ids {
        Box::new(SequentialIds::default())
    } else {
        Box::new(UuidIds)
    };
    let mut report = compile_config_with_ids(&config, &registry, options, &mut *ids);

    if args.verify {
        progress.advance("Verifying documents");
        for (key, document) in &report.succeeded {
            verify::verify_document(document)
                .with_context(|| format!("Compiled document '{}' failed verification.", key))?;
        }
    }

    progress.advance("Writing output");
    if args.split {
        reject_unsafe_file_names(&mut report);
    }
    write_report(&report, args)?;

    for (key, err) in &report.failed {
        eprintln!("  {}: {}", key, err);
    }
    if !report.is_success() && !args.allow_failures {
        bail!(
            "{} of {} functional mappings failed to compile.",
            report.failed.len(),
            report.total()
        );
    }
    Ok(())
}

#[cfg(not(target_arch = "wasm32"))]
fn reject_unsafe_file_names(report: &mut CompileReport) {
    let unsafe_keys = report
        .succeeded
        .keys()
        .filter(|key| !is_plain_file_name(key))
        .cloned()
        .collect::<Vec<_>>();
    for key in unsafe_keys {
        report.succeeded.shift_remove(&key);
        report
            .failed
            .insert(key.clone(), CompileError::UnsafeFileName(key));
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn is_plain_file_name(key: &str) -> bool {
    let mut components = Path::new(key).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !key.contains(['/', '\\', ':'])
}

#[cfg(not(target_arch = "wasm32"))]
fn write_report(report: &CompileReport, args: &cli::Args) -> Result<()> {
    match (&args.output, args.split) {
        (Some(dir), true) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create '{}'.", dir.display()))?;
            for (key, document) in &report.succeeded {
                let path = dir.join(format!("{}.xml", key));
                fs::write(&path, document)
                    .with_context(|| format!("Failed to write '{}'.", path.display()))?;
            }
            if !report.failed.is_empty() {
                let failures = serde_json::to_string_pretty(&report.to_json()["failed"])?;
                fs::write(dir.join("failures.json"), failures)?;
            }
        }
        (Some(path), false) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, serde_json::to_string_pretty(&report.to_json())?)
                .with_context(|| format!("Failed to write '{}'.", path.display()))?;
        }
        (None, _) => println!("{}", serde_json::to_string_pretty(&report.to_json())?),
    }
    Ok(())
}

pub fn compile_json(config_json: &str, registry_json: &str, options: CompileOptions) -> Result<String> {
    let config: MappingConfig =
        serde_json::from_str(config_json).context("Invalid mapping config JSON.")?;
    let registry: Registry = if registry_json.trim().is_empty() {
        Registry::default()
    } else {
        serde_json::from_str(registry_json).context("Invalid registry JSON.")?
    };
    let report = compile_config(&config, &registry, options);
    Ok(serde_json::to_string(&report.to_json())?)
}

pub fn canonicalize_file(path: &Path) -> Result<PathBuf> {
    if !path.exists() || !path.is_file() {
        return Err(anyhow::anyhow!("Input file not found: '{}'.", path.display()));
    }
    Ok(path.canonicalize()?)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}'.", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in '{}'.", path.display()))
}

#[cfg(not(target_arch = "wasm32"))]
struct CliProgress {
    prefix: &'static str,
    step: usize,
    total: usize,
}

#[cfg(not(target_arch = "wasm32"))]
impl CliProgress {
    fn new(prefix: &'static str, total: usize) -> Self {
        Self {
            prefix,
            step: 0,
            total: total.max(1),
        }
    }

    fn advance(&mut self, label: &str) {
        self.step = (self.step + 1).min(self.total);
        eprintln!(
            "[{}] {}... ({}/{}) {}",
            self.prefix,
            label,
            self.step,
            self.total,
            render_progress_bar(self.step, self.total, 14)
        );
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn render_progress_bar(step: usize, total: usize, width: usize) -> String {
    let width = width.max(1);
    let filled = ((step * width + total / 2) / total).min(width);
    format!("[{}{}]", "=".repeat(filled), "-".repeat(width - filled))
}
