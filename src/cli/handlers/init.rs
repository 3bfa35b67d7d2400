use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::config_io::CONFIG_FILE;
use crate::io::recovery::atomic_write;
use crate::io::store::SheetStore;
use crate::io::workbook_io::WorkbookFile;
use crate::model::config::SyncConfig;
use crate::model::sheet::{HEADER_ROW, TEMPLATE_TAB};
use crate::model::workbook::Workbook;

const CONFIG_TEMPLATE: &str = r##"# {name}

[sheet]
# Workbook file, relative to this directory
workbook = "workbook.json"
# Tab that receives new and updated issue rows
active_tab = "Next"
initial_status = "Pending"

[links]
# The issue key is appended to this URL in the column A hyperlink
base_url = ""

[keys]
# Accepted project prefixes, e.g. ["ADV", "OPS"]. Empty accepts any PREFIX-123.
prefixes = []

[labels.environments]
dev = "Dev"
qa = "QA"
stage = "Stage"
production = "Production"

[labels.apps]
web = "Web"
api = "API"
ios = "iOS"
android = "Android"

[rotation]
# Syncing this environment archives the active tab
terminal_environment = "production"
# Copy a cell (e.g. a version marker) from the archived tab into the new one
# carry_from = "K1"
# carry_to = "K1"
"##;

/// Infer a release name from a directory name: replace hyphens with spaces, title-case.
fn infer_name(dir_name: &str) -> String {
    dir_name
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => {
                    let upper: String = c.to_uppercase().collect();
                    upper + chars.as_str()
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_config(name: &str) -> String {
    CONFIG_TEMPLATE.replace("{name}", name)
}

/// Starter workbook: the active tab and the template, each with the header row.
fn starter_workbook(path: &Path, active_tab: &str) -> Result<WorkbookFile, Box<dyn std::error::Error>> {
    let mut book = Workbook::new();
    book.push_tab(active_tab, Vec::new());
    book.push_tab(TEMPLATE_TAB, Vec::new());
    let mut file = WorkbookFile::create(path, book)?;

    let header: Vec<String> = HEADER_ROW.iter().map(|s| s.to_string()).collect();
    for tab in [active_tab, TEMPLATE_TAB] {
        file.append_row(tab, &header)?;
    }
    Ok(file)
}

pub fn cmd_init(args: InitArgs, dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = dir.join(CONFIG_FILE);
    let defaults = SyncConfig::default();
    let workbook_path = dir.join(&defaults.sheet.workbook);

    if !args.force {
        for path in [&config_path, &workbook_path] {
            if path.exists() {
                return Err(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )
                .into());
            }
        }
    }

    let name = args.name.unwrap_or_else(|| {
        dir.file_name()
            .and_then(|n| n.to_str())
            .map(infer_name)
            .unwrap_or_else(|| "Release".to_string())
    });

    atomic_write(&config_path, render_config(&name).as_bytes()).map_err(|e| {
        format!("could not write {}: {}", config_path.display(), e)
    })?;
    starter_workbook(&workbook_path, &defaults.sheet.active_tab)?;

    println!("Initialized relsync: {}", name);
    println!("  config:   {}", config_path.display());
    println!("  workbook: {}", workbook_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::workbook_io::load_workbook;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_infer_name() {
        assert_eq!(infer_name("mobile-release"), "Mobile Release");
        assert_eq!(infer_name("web"), "Web");
    }

    #[test]
    fn test_rendered_config_matches_defaults() {
        let rendered = render_config("Spring Release");
        assert!(rendered.starts_with("# Spring Release\n"));
        let config: SyncConfig = toml::from_str(&rendered).unwrap();
        let defaults = SyncConfig::default();
        assert_eq!(config.sheet.workbook, defaults.sheet.workbook);
        assert_eq!(config.sheet.active_tab, defaults.sheet.active_tab);
        assert_eq!(config.labels.environments, defaults.labels.environments);
        assert_eq!(config.labels.apps, defaults.labels.apps);
        assert_eq!(config.rotation.terminal_environment, "production");
        assert_eq!(config.rotation.carry_from, None);
        assert!(config.keys.prefixes.is_empty());
    }

    #[test]
    fn test_starter_workbook_layout() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("workbook.json");
        starter_workbook(&path, "Next").unwrap();

        let book = load_workbook(&path).unwrap();
        assert_eq!(book.names(), vec!["Next", "Template"]);
        for tab in &book.tabs {
            assert_eq!(tab.rows.len(), 1);
            assert_eq!(tab.rows[0], HEADER_ROW.to_vec());
        }
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let tmp = TempDir::new().unwrap();
        let args = || InitArgs {
            name: Some("R".to_string()),
            force: false,
        };
        cmd_init(args(), tmp.path()).unwrap();
        assert!(cmd_init(args(), tmp.path()).is_err());
        let forced = InitArgs {
            name: None,
            force: true,
        };
        cmd_init(forced, tmp.path()).unwrap();
    }
}
