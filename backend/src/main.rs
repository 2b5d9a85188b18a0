//! Constman CLI - edit constant CSV files from the command line
//!
//! ```bash
//! constman list constants.csv              # Show all constants
//! constman list constants.csv --json       # Same, as JSON
//! constman check constants.csv             # Report rows that would be skipped
//! constman validate --name MAX_SPEED --logical 最高速度 --value 120
//! constman add -f constants.csv --name MAX_SPEED --logical 最高速度 --value 120
//! constman set -f constants.csv MAX_SPEED --value 130
//! constman remove -f constants.csv MAX_SPEED
//! constman import -f constants.csv vendor.csv [--replace]
//! constman export -f constants.csv -o subset.csv MAX_SPEED MIN_SPEED
//! ```
//!
//! `-f` falls back to `CONSTMAN_FILE` (see `.env`).

use clap::{Parser, Subcommand};
use constman::{
    codec, validate_draft, CollectionError, ConstantCollection, ConstantRecord, LoadMode,
    RecordDraft, Settings, LOG_BROADCASTER,
};
use std::path::{Path, PathBuf};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "constman")]
#[command(about = "Manage named constants stored in CSV files", long_about = None)]
struct Cli {
    /// Silence operation logs on stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct FileArg {
    /// CSV file (default: $CONSTMAN_FILE)
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[derive(clap::Args)]
struct FieldArgs {
    /// Logical (display) name
    #[arg(short, long)]
    logical: Option<String>,

    /// Value
    #[arg(short, long)]
    value: Option<String>,

    /// Unit
    #[arg(short, long)]
    unit: Option<String>,

    /// Description (may contain newlines)
    #[arg(short, long)]
    description: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List constants in a CSV file
    List {
        /// CSV file (default: $CONSTMAN_FILE)
        file: Option<PathBuf>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Load a CSV file and report skipped rows
    Check {
        /// CSV file (default: $CONSTMAN_FILE)
        file: Option<PathBuf>,
    },

    /// Validate field input without touching any file
    Validate {
        /// Physical name (key)
        #[arg(short, long)]
        name: String,

        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Add a new constant
    Add {
        #[command(flatten)]
        target: FileArg,

        /// Physical name (key)
        #[arg(short, long)]
        name: String,

        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Change fields of an existing constant
    Set {
        #[command(flatten)]
        target: FileArg,

        /// Physical name (key)
        name: String,

        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Remove a constant
    Remove {
        #[command(flatten)]
        target: FileArg,

        /// Physical name (key)
        name: String,
    },

    /// Import another CSV file into the target
    Import {
        #[command(flatten)]
        target: FileArg,

        /// CSV file to import
        source: PathBuf,

        /// Replace the target's contents instead of merging
        #[arg(long, conflicts_with = "merge")]
        replace: bool,

        /// Merge into the target (overrides $CONSTMAN_LOAD_MODE)
        #[arg(long)]
        merge: bool,
    },

    /// Write selected constants to another CSV file
    Export {
        #[command(flatten)]
        target: FileArg,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,

        /// Physical names to export
        #[arg(required = true)]
        names: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    };
    LOG_BROADCASTER.set_echo(!(cli.quiet || settings.quiet));

    let result = match cli.command {
        Commands::List { file, json } => cmd_list(&settings, file, json),
        Commands::Check { file } => cmd_check(&settings, file),
        Commands::Validate { name, fields } => cmd_validate(name, fields),
        Commands::Add { target, name, fields } => cmd_add(&settings, target, name, fields),
        Commands::Set { target, name, fields } => cmd_set(&settings, target, name, fields),
        Commands::Remove { target, name } => cmd_remove(&settings, target, name),
        Commands::Import {
            target,
            source,
            replace,
            merge,
        } => {
            let mode = if replace {
                LoadMode::Replace
            } else if merge {
                LoadMode::Merge
            } else {
                settings.load_mode
            };
            cmd_import(&settings, target, &source, mode)
        }
        Commands::Export {
            target,
            output,
            names,
        } => cmd_export(&settings, target, &output, &names),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn resolve_file(settings: &Settings, file: Option<PathBuf>) -> Result<PathBuf, String> {
    file.or_else(|| settings.default_file.clone())
        .ok_or_else(|| "No CSV file given (pass one or set CONSTMAN_FILE)".to_string())
}

/// Open the target, starting empty when it does not exist yet.
fn open_or_new(path: &Path) -> Result<ConstantCollection, CollectionError> {
    if path.exists() {
        ConstantCollection::open(path)
    } else {
        eprintln!("📄 {} does not exist yet, starting empty", path.display());
        Ok(ConstantCollection::new())
    }
}

fn save_if_dirty(collection: &mut ConstantCollection, path: &Path) -> CliResult {
    if collection.has_unsaved_changes() {
        collection.save(path)?;
    } else {
        eprintln!("   No changes to save");
    }
    Ok(())
}

fn draft_from(name: String, fields: FieldArgs) -> RecordDraft {
    RecordDraft {
        physical_name: name,
        logical_name: fields.logical,
        value: fields.value.unwrap_or_default(),
        unit: fields.unit,
        description: fields.description,
    }
}

/// Print validation messages. Returns false when a blocking error was found.
fn report_validation(draft: &RecordDraft, existing: bool) -> bool {
    let report = validate_draft(draft, existing);
    for (field, message) in &report.errors {
        eprintln!("   ❌ {}: {}", field, message);
    }
    for (field, message) in &report.warnings {
        eprintln!("   ⚠️  {}: {}", field, message);
    }
    !report.is_blocked()
}

fn cmd_list(settings: &Settings, file: Option<PathBuf>, json: bool) -> CliResult {
    let path = resolve_file(settings, file)?;
    let collection = ConstantCollection::open(&path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(collection.records())?);
        return Ok(());
    }

    eprintln!("📋 {} constants in {}\n", collection.len(), path.display());
    for record in collection.records() {
        println!("  {}", record);
        if !record.description().is_empty() {
            for line in record.description().lines() {
                println!("      {}", line);
            }
        }
    }
    Ok(())
}

fn cmd_check(settings: &Settings, file: Option<PathBuf>) -> CliResult {
    let path = resolve_file(settings, file)?;
    let report = codec::load_with_report(&path)?;

    eprintln!("\n📊 Results:");
    eprintln!("   Encoding: {}", report.encoding);
    eprintln!("   Valid rows: {}", report.records.len());
    eprintln!("   Skipped rows: {}", report.skipped.len());
    for row in report.skipped.iter().take(20) {
        eprintln!("     - line {}: {}", row.line, row.reason);
    }

    if !report.skipped.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_validate(name: String, fields: FieldArgs) -> CliResult {
    let draft = draft_from(name, fields);
    eprintln!("✔️  Validating {}", draft.physical_name);
    if !report_validation(&draft, false) {
        return Err("validation failed".into());
    }
    eprintln!("✅ Input is valid");
    Ok(())
}

fn cmd_add(settings: &Settings, target: FileArg, name: String, fields: FieldArgs) -> CliResult {
    let path = resolve_file(settings, target.file)?;
    let draft = draft_from(name, fields);
    if !report_validation(&draft, false) {
        return Err("validation failed, nothing added".into());
    }

    let mut collection = open_or_new(&path)?;
    collection.add(draft.build()?)?;
    save_if_dirty(&mut collection, &path)
}

fn cmd_set(settings: &Settings, target: FileArg, name: String, fields: FieldArgs) -> CliResult {
    let path = resolve_file(settings, target.file)?;
    let mut collection = ConstantCollection::open(&path)?;

    let existing = collection
        .get(&name)
        .ok_or_else(|| CollectionError::NotFound(name.clone()))?;
    let mut draft = RecordDraft::from(existing);
    if let Some(logical) = fields.logical {
        draft.logical_name = Some(logical);
    }
    if let Some(value) = fields.value {
        draft.value = value;
    }
    if let Some(unit) = fields.unit {
        draft.unit = Some(unit);
    }
    if let Some(description) = fields.description {
        draft.description = Some(description);
    }

    if !report_validation(&draft, true) {
        return Err("validation failed, nothing changed".into());
    }

    collection.update(&ConstantRecord::from_draft(&draft)?)?;
    save_if_dirty(&mut collection, &path)
}

fn cmd_remove(settings: &Settings, target: FileArg, name: String) -> CliResult {
    let path = resolve_file(settings, target.file)?;
    let mut collection = ConstantCollection::open(&path)?;
    if collection.delete_by_name(&name).is_none() {
        eprintln!("   {} not found", name);
    }
    save_if_dirty(&mut collection, &path)
}

fn cmd_import(settings: &Settings, target: FileArg, source: &Path, mode: LoadMode) -> CliResult {
    let path = resolve_file(settings, target.file)?;
    let mut collection = open_or_new(&path)?;

    let summary = collection.load(source, mode)?;
    eprintln!(
        "📥 {} import of {}: {} read, {} updated, {} appended, {} skipped",
        summary.mode,
        source.display(),
        summary.loaded,
        summary.updated,
        summary.appended,
        summary.skipped
    );
    save_if_dirty(&mut collection, &path)
}

fn cmd_export(settings: &Settings, target: FileArg, output: &Path, names: &[String]) -> CliResult {
    let path = resolve_file(settings, target.file)?;
    let collection = ConstantCollection::open(&path)?;
    let count = collection.export(output, names)?;
    eprintln!("📤 Exported {} constants to {}", count, output.display());
    Ok(())
}
