mod init;
pub use init::cmd_init;

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate, Utc};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::{self, ConfigError};
use crate::io::lock::WorkbookLock;
use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};
use crate::io::store::SheetStore;
use crate::io::workbook_io::WorkbookFile;
use crate::model::config::SyncConfig;
use crate::ops::indexer::index_tab;
use crate::ops::rotate::{RotateError, RotationSettings, rotate};
use crate::ops::source::{RecordDefaults, RecordSource};
use crate::ops::sync::{SyncError, SyncRequest, run_sync};
use crate::ops::upsert::{ApplyError, CellWrite};
use crate::parse::ticket_key::TicketKeyParser;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;
    let start = match cli.project_dir {
        Some(ref dir) => std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir.display(), e))?,
        None => std::env::current_dir()?,
    };

    match cli.command {
        // Commands that do not need an existing project
        Commands::Init(args) => cmd_init(args, &start),
        Commands::Keys(args) => cmd_keys(args, &start, json),

        Commands::Sync(args) => cmd_sync(args, &load_context(&start)?, json),
        Commands::Index => cmd_index(&load_context(&start)?, json),
        Commands::Rotate(args) => cmd_rotate(args, &load_context(&start)?, json),
        Commands::Tabs => cmd_tabs(&load_context(&start)?, json),
        Commands::Config(args) => cmd_config(args, &start),
        Commands::Recovery(args) => cmd_recovery(args, &start, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A discovered relsync project
struct Context {
    /// Directory holding relsync.toml (and the recovery log)
    dir: PathBuf,
    config: SyncConfig,
}

impl Context {
    fn workbook_path(&self) -> PathBuf {
        self.dir.join(&self.config.sheet.workbook)
    }

    fn open_workbook(&self) -> Result<WorkbookFile, Box<dyn std::error::Error>> {
        Ok(WorkbookFile::open(&self.workbook_path())?)
    }
}

fn load_context(start: &Path) -> Result<Context, ConfigError> {
    let dir = config_io::discover_config(start)?;
    let config = config_io::load_config(&dir)?;
    tracing::debug!(dir = %dir.display(), workbook = %config.sheet.workbook, "loaded config");
    Ok(Context { dir, config })
}

fn parse_date(date: Option<&str>) -> Result<NaiveDate, String> {
    match date {
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|e| format!("invalid date \"{}\" (expected YYYY-MM-DD): {}", s, e)),
        None => Ok(Local::now().date_naive()),
    }
}

fn read_text_arg(path: &str) -> Result<String, Box<dyn std::error::Error>> {
    if path == "-" {
        return Ok(std::io::read_to_string(std::io::stdin())?);
    }
    std::fs::read_to_string(path).map_err(|e| format!("could not read {}: {}", path, e).into())
}

fn record_source(args: &SyncArgs) -> Result<RecordSource, Box<dyn std::error::Error>> {
    if !args.issue.is_empty() {
        return Ok(RecordSource::Keys(args.issue.clone()));
    }
    if let Some(ref text) = args.text {
        return Ok(RecordSource::Text(read_text_arg(text)?));
    }
    match args.records {
        Some(ref path) => Ok(RecordSource::File(path.clone())),
        None => Err("one of --issue, --text or --records is required".into()),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

/// Record the part of a failed run that did not reach the workbook.
fn log_failure(ctx: &Context, environment: Option<&str>, err: &SyncError) {
    let tab = &ctx.config.sheet.active_tab;
    let mut fields = vec![
        ("Workbook".to_string(), ctx.config.sheet.workbook.clone()),
        ("Tab".to_string(), tab.clone()),
    ];
    if let Some(env) = environment {
        fields.push(("Environment".to_string(), env.to_string()));
    }

    let entry = match err {
        SyncError::Apply { source, pending } => apply_entry(source, pending, fields),
        SyncError::Rotate(e) => rotation_entry(e, fields),
        _ => return,
    };
    recovery::log_recovery(&ctx.dir, entry);
    eprintln!(
        "unapplied changes recorded in {}",
        recovery::recovery_log_path(&ctx.dir).display()
    );
}

/// Recovery entry listing the writes a failed apply left undone.
pub fn apply_entry(
    err: &ApplyError,
    pending: &[CellWrite],
    mut fields: Vec<(String, String)>,
) -> RecoveryEntry {
    fields.push(("Error".to_string(), err.source.to_string()));
    let body: Vec<String> = pending.iter().map(format_write_line).collect();
    RecoveryEntry {
        timestamp: Utc::now(),
        category: RecoveryCategory::Write,
        description: format!("sync stopped after {} of {} writes", err.applied, err.total),
        fields,
        body: body.join("\n"),
    }
}

/// Recovery entry naming the rotation step that failed.
pub fn rotation_entry(err: &RotateError, mut fields: Vec<(String, String)>) -> RecoveryEntry {
    if let Some(ref name) = err.archive_name {
        fields.push(("Archive".to_string(), name.clone()));
    }
    fields.push(("Error".to_string(), err.source.to_string()));
    RecoveryEntry {
        timestamp: Utc::now(),
        category: RecoveryCategory::Rotation,
        description: format!("rotation stopped at step \"{}\"", err.step),
        fields,
        body: String::new(),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_sync(args: SyncArgs, ctx: &Context, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let today = parse_date(args.date.as_deref())?;
    let parser = TicketKeyParser::new(&ctx.config.keys.prefixes)?;
    let source = record_source(&args)?;
    let defaults = RecordDefaults {
        environment: args.environment.clone(),
        app: args.app.clone(),
        author: args.author.clone(),
    };
    let records = source.load(&parser, &defaults)?;
    if records.is_empty() {
        tracing::warn!(source = %source.label(), "no issue records found");
    }

    let request = SyncRequest {
        records,
        environment: args.environment.clone(),
        today,
        carry: args.carry,
        rotate: !args.no_rotate,
        dry_run: args.dry_run,
    };

    let _lock = if args.dry_run {
        None
    } else {
        Some(WorkbookLock::acquire_default(&ctx.workbook_path())?)
    };
    let mut store = ctx.open_workbook()?;
    let report = match run_sync(&mut store, &ctx.config, &request) {
        Ok(report) => report,
        Err(e) => {
            log_failure(ctx, Some(&args.environment), &e);
            return Err(e.into());
        }
    };

    if json {
        print_json(&report)
    } else {
        print_lines(&format_sync_report(&report));
        Ok(())
    }
}

fn cmd_index(ctx: &Context, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let parser = TicketKeyParser::new(&ctx.config.keys.prefixes)?;
    let store = ctx.open_workbook()?;
    let tab = &ctx.config.sheet.active_tab;
    let index = index_tab(&store, tab, &parser)?;

    if json {
        print_json(&index_to_json(tab, &index))
    } else {
        print_lines(&format_index(tab, &index));
        Ok(())
    }
}

fn cmd_rotate(args: RotateArgs, ctx: &Context, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let today = parse_date(args.date.as_deref())?;
    let settings = RotationSettings::from_config(&ctx.config)?;

    let _lock = WorkbookLock::acquire_default(&ctx.workbook_path())?;
    let mut store = ctx.open_workbook()?;
    for tab in [&settings.active_tab, &settings.template_tab] {
        if store.find_tab(tab)?.is_none() {
            return Err(SyncError::MissingTab(tab.clone()).into());
        }
    }

    let outcome = match rotate(&mut store, &settings, args.carry.as_deref(), today) {
        Ok(outcome) => outcome,
        Err(e) => {
            let e = SyncError::Rotate(e);
            log_failure(ctx, None, &e);
            return Err(e.into());
        }
    };

    if json {
        print_json(&outcome)
    } else {
        print_lines(&format_rotation(&outcome));
        Ok(())
    }
}

fn cmd_tabs(ctx: &Context, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.open_workbook()?;
    let tabs = store.tabs()?;
    let active = &ctx.config.sheet.active_tab;

    if json {
        print_json(&TabListJson {
            active: active.clone(),
            tabs,
        })
    } else {
        print_lines(&format_tab_listing(&tabs, active));
        Ok(())
    }
}

fn cmd_keys(args: KeysArgs, start: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    // Outside a project any prefix is accepted
    let prefixes = match load_context(start) {
        Ok(ctx) => ctx.config.keys.prefixes,
        Err(ConfigError::NotFound) => Vec::new(),
        Err(e) => return Err(e.into()),
    };
    let parser = TicketKeyParser::new(&prefixes)?;
    let text = match args.text {
        Some(text) => text,
        None => std::io::read_to_string(std::io::stdin())?,
    };
    let keys = parser.extract(&text);

    if json {
        print_json(&KeysJson { keys })
    } else {
        print_lines(&keys);
        Ok(())
    }
}

fn cmd_config(args: ConfigCmd, start: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let dir = config_io::discover_config(start)?;
    let (_, mut doc) = config_io::read_config(&dir)?;
    match args.action {
        ConfigAction::Get(a) => match config_io::get_value(&doc, &a.key)? {
            Some(value) => {
                println!("{}", value);
                Ok(())
            }
            None => Err(format!("{} is not set", a.key).into()),
        },
        ConfigAction::Set(a) => {
            config_io::set_value(&mut doc, &a.key, &a.value)?;
            config_io::write_config(&dir, &doc)?;
            tracing::info!(key = %a.key, value = %a.value, "updated relsync.toml");
            Ok(())
        }
    }
}

fn cmd_recovery(args: RecoveryArgs, start: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let dir = config_io::discover_config(start)?;
    let path = recovery::recovery_log_path(&dir);
    let log = recovery::read_recovery_log(&dir)?.unwrap_or_default();
    let mut entries = recovery::split_entries(&log);
    if let Some(n) = args.tail {
        let skip = entries.len().saturating_sub(n);
        entries.drain(..skip);
    }

    if json {
        return print_json(&RecoveryJson {
            path: path.display().to_string(),
            entries,
        });
    }
    if entries.is_empty() {
        println!("no recovery entries");
        return Ok(());
    }
    println!("{}", entries.join("\n\n---\n\n"));
    Ok(())
}
