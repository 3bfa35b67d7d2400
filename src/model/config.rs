use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Configuration from relsync.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub sheet: SheetConfig,
    #[serde(default)]
    pub links: LinkConfig,
    #[serde(default)]
    pub keys: KeyConfig,
    #[serde(default)]
    pub labels: LabelConfig,
    #[serde(default)]
    pub rotation: RotationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Workbook file, relative to the directory holding relsync.toml
    #[serde(default = "default_workbook")]
    pub workbook: String,
    /// Tab that receives new and updated issue rows
    #[serde(default = "default_active_tab")]
    pub active_tab: String,
    /// Status written into column B of inserted rows
    #[serde(default = "default_initial_status")]
    pub initial_status: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        SheetConfig {
            workbook: default_workbook(),
            active_tab: default_active_tab(),
            initial_status: default_initial_status(),
        }
    }
}

fn default_workbook() -> String {
    "workbook.json".to_string()
}

fn default_active_tab() -> String {
    "Next".to_string()
}

fn default_initial_status() -> String {
    "Pending".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Prefix of the issue link; the key is appended (e.g. `https://jira.example.com/browse/`)
    #[serde(default)]
    pub base_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Project prefixes accepted as issue keys. Empty accepts any prefix.
    #[serde(default)]
    pub prefixes: Vec<String>,
}

/// Display labels for environment and app tags. Lookup ignores case;
/// unknown tags are written as given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    #[serde(default = "default_environment_labels")]
    pub environments: IndexMap<String, String>,
    #[serde(default = "default_app_labels")]
    pub apps: IndexMap<String, String>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        LabelConfig {
            environments: default_environment_labels(),
            apps: default_app_labels(),
        }
    }
}

fn label_map(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn default_environment_labels() -> IndexMap<String, String> {
    label_map(&[
        ("dev", "Dev"),
        ("qa", "QA"),
        ("stage", "Stage"),
        ("production", "Production"),
    ])
}

fn default_app_labels() -> IndexMap<String, String> {
    label_map(&[
        ("web", "Web"),
        ("api", "API"),
        ("ios", "iOS"),
        ("android", "Android"),
    ])
}

fn lookup_label(map: &IndexMap<String, String>, tag: &str) -> String {
    let needle = tag.trim();
    map.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(needle))
        .map(|(_, v)| v.clone())
        .unwrap_or_else(|| tag.to_string())
}

impl LabelConfig {
    pub fn environment_label(&self, environment: &str) -> String {
        lookup_label(&self.environments, environment)
    }

    pub fn app_label(&self, app: &str) -> String {
        lookup_label(&self.apps, app)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Environment whose sync triggers archival of the active tab
    #[serde(default = "default_terminal_environment")]
    pub terminal_environment: String,
    /// Cell read from the active tab before rotation (e.g. a version marker)
    #[serde(default)]
    pub carry_from: Option<String>,
    /// Cell of the fresh active tab that receives the carried value.
    /// Defaults to `carry_from`.
    #[serde(default)]
    pub carry_to: Option<String>,
}

impl Default for RotationConfig {
    fn default() -> Self {
        RotationConfig {
            terminal_environment: default_terminal_environment(),
            carry_from: None,
            carry_to: None,
        }
    }
}

fn default_terminal_environment() -> String {
    "production".to_string()
}

impl RotationConfig {
    pub fn is_terminal(&self, environment: &str) -> bool {
        self.terminal_environment
            .eq_ignore_ascii_case(environment.trim())
    }
}
