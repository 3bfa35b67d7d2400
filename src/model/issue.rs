use serde::{Deserialize, Serialize};

/// One tracked work item to reconcile into the active tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    /// Canonical `PREFIX-NUMBER` key
    #[serde(alias = "issueKey", alias = "key")]
    pub issue_key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    /// Deployment stage tag (`dev`, `stage`, `production`, ...)
    #[serde(default)]
    pub environment: String,
    /// Product tag
    #[serde(default)]
    pub app: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl IssueRecord {
    pub fn new(issue_key: &str, environment: &str, app: &str) -> Self {
        IssueRecord {
            issue_key: issue_key.to_string(),
            title: String::new(),
            author: String::new(),
            environment: environment.to_string(),
            app: app.to_string(),
            url: None,
        }
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.author = author.to_string();
        self
    }

    /// Trimmed, uppercased key used for row matching.
    pub fn normalized_key(&self) -> String {
        self.issue_key.trim().to_ascii_uppercase()
    }
}
