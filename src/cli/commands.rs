use std::io::{self, Write};
use std::path::Path;

use crate::config::Settings;
use crate::error::Result;
use crate::store::SqliteStore;
use crate::transfer::{
    BuiltinDescriptors, DescriptorRegistry, ExportEngine, ImportEngine, ImportReport,
    JsonDescriptorFile, OverwriteAction, UploadedFile, WriteOutcome, write_document,
};

use super::theme;

/// The built-in transfers plus any from the configured descriptor file.
pub fn build_registry(settings: &Settings) -> Result<DescriptorRegistry> {
    match &settings.descriptors_file {
        Some(path) => {
            DescriptorRegistry::from_sources(&[&BuiltinDescriptors, &JsonDescriptorFile::new(path)])
        }
        None => DescriptorRegistry::from_sources(&[&BuiltinDescriptors]),
    }
}

pub fn list_descriptors(registry: &DescriptorRegistry) {
    if registry.is_empty() {
        println!("No transfers registered.");
        return;
    }

    println!("{}", theme::header(&format!("Transfers ({}):", registry.len())));
    for descriptor in registry.iter() {
        println!(
            "  {} {} [{}]",
            theme::title(descriptor.name()),
            theme::dim(descriptor.caption()),
            theme::label(&descriptor.content_types().join(", "))
        );
        for key in descriptor.foreign_keys() {
            println!("    {}", theme::meta(&key.name()));
        }
    }
}

/// Export `transfer` into `out_dir`. An unknown transfer fails before the
/// database is opened. Returns false when the user declined to overwrite an
/// existing file.
pub fn export(
    settings: &Settings,
    registry: &DescriptorRegistry,
    transfer: &str,
    out_dir: &Path,
    force: bool,
) -> Result<bool> {
    registry.get(transfer)?;
    let store = SqliteStore::open(&settings.db_path)?;
    let document = ExportEngine::new(registry)
        .with_page_size(settings.page_size)
        .export(transfer, &store)?;

    let mut on_conflict = |path: &Path| {
        if force {
            Ok(OverwriteAction::Overwrite)
        } else {
            confirm_overwrite(path)
        }
    };
    let stats = write_document(&document, out_dir, &settings.site_name, &mut on_conflict)?;

    match stats.outcome {
        WriteOutcome::Written => {
            println!(
                "{} {} records to {}",
                theme::success("Exported"),
                theme::meta(&stats.records.to_string()),
                theme::dim(&stats.path.display().to_string())
            );
            Ok(true)
        }
        WriteOutcome::Skipped => {
            println!("{}", theme::warning("Kept existing file."));
            Ok(true)
        }
        WriteOutcome::Aborted => {
            println!("Cancelled.");
            Ok(false)
        }
    }
}

fn confirm_overwrite(path: &Path) -> Result<OverwriteAction> {
    print!(
        "{}",
        theme::prompt(&format!("{} exists. Overwrite? [y/N]: ", path.display()))
    );
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_lowercase();

    if input == "y" || input == "yes" {
        Ok(OverwriteAction::Overwrite)
    } else {
        Ok(OverwriteAction::Abort)
    }
}

/// Import `file` as `transfer`. The database is opened only once the upload
/// has been accepted. Returns false when any record was skipped.
pub fn import(
    settings: &Settings,
    registry: &DescriptorRegistry,
    transfer: &str,
    file: &Path,
) -> Result<bool> {
    registry.get(transfer)?;
    let upload = if file.exists() {
        Some(UploadedFile::from_path(file)?)
    } else {
        None
    };

    let engine = ImportEngine::new(registry).with_max_upload_bytes(settings.max_upload_bytes);
    let document = engine.read_upload(transfer, upload.as_ref())?;

    let mut store = SqliteStore::open(&settings.db_path)?;
    let mut messages: Vec<String> = Vec::new();
    let report = engine.import_document(transfer, document, &mut store, &mut messages)?;

    for message in &messages {
        eprintln!("{}", theme::error(message));
    }
    print_report(&report);
    Ok(report.is_clean())
}

fn print_report(report: &ImportReport) {
    println!(
        "{} {} records",
        theme::success("Imported"),
        theme::meta(&report.imported.to_string())
    );
    for (record_type, count) in &report.imported_by_type {
        println!("  {} {}", theme::label(record_type), theme::meta(&count.to_string()));
    }
    if report.failed > 0 {
        println!(
            "{}",
            theme::warning(&format!("{} records skipped", report.failed))
        );
    }
}
