use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::layout_engine::Orientation;
use crate::model::tab_group::DEFAULT_FRAME_TOLERANCE;
use crate::model::virtual_workspace::MAX_WORKSPACES;

pub fn config_file() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".tessel.toml")
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    workspaces: WorkspaceSettings,
    #[serde(default)]
    app_rules: Vec<AppRule>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Config {
    pub settings: Settings,
    pub workspaces: WorkspaceSettings,
    pub app_rules: Vec<AppRule>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_workspace_count")]
    pub workspace_count: usize,
    /// Maximum per-component difference for two frames to count as the same
    /// native tab group.
    #[serde(default = "default_tab_frame_tolerance")]
    pub tab_frame_tolerance: f64,
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
    /// How much of a parked window stays on screen.
    #[serde(default = "default_hide_peek_margin")]
    pub hide_peek_margin: f64,
    #[serde(default = "default_identity_retry_attempts")]
    pub identity_retry_attempts: u32,
    #[serde(default = "default_identity_retry_delay_ms")]
    pub identity_retry_delay_ms: u64,
    #[serde(default)]
    pub default_split: Orientation,
    #[serde(default)]
    pub gaps: GapSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workspace_count: default_workspace_count(),
            tab_frame_tolerance: default_tab_frame_tolerance(),
            event_queue_capacity: default_event_queue_capacity(),
            hide_peek_margin: default_hide_peek_margin(),
            identity_retry_attempts: default_identity_retry_attempts(),
            identity_retry_delay_ms: default_identity_retry_delay_ms(),
            default_split: Orientation::default(),
            gaps: GapSettings::default(),
        }
    }
}

/// Gap configuration for window spacing
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct GapSettings {
    #[serde(default)]
    pub outer: OuterGaps,
    /// Space on each side of every split boundary, in total.
    #[serde(default)]
    pub inner: f64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct OuterGaps {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub right: f64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceSettings {
    #[serde(default)]
    pub names: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct AppRule {
    /// Application bundle identifier (e.g., "com.apple.Terminal")
    pub app_id: String,
    /// Target workspace (1 based). If None, the window goes to the active
    /// workspace of the display it opened on.
    pub workspace: Option<u8>,
    #[serde(default)]
    pub floating: bool,
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.workspace_count == 0 || self.workspace_count > MAX_WORKSPACES {
            issues.push(format!(
                "workspace_count must be between 1 and {MAX_WORKSPACES}, got {}",
                self.workspace_count
            ));
        }
        if self.tab_frame_tolerance < 0.0 {
            issues.push(format!(
                "tab_frame_tolerance must be non-negative, got {}",
                self.tab_frame_tolerance
            ));
        }
        if self.event_queue_capacity == 0 {
            issues.push("event_queue_capacity must be at least 1".to_string());
        }
        if self.hide_peek_margin < 0.0 {
            issues.push(format!(
                "hide_peek_margin must be non-negative, got {}",
                self.hide_peek_margin
            ));
        }
        if self.identity_retry_attempts == 0 {
            issues.push("identity_retry_attempts must be at least 1".to_string());
        }

        issues.extend(self.gaps.validate());

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if self.workspace_count == 0 {
            self.workspace_count = 1;
            fixes += 1;
        }
        if self.workspace_count > MAX_WORKSPACES {
            self.workspace_count = MAX_WORKSPACES;
            fixes += 1;
        }
        if self.tab_frame_tolerance < 0.0 {
            self.tab_frame_tolerance = default_tab_frame_tolerance();
            fixes += 1;
        }
        if self.event_queue_capacity == 0 {
            self.event_queue_capacity = default_event_queue_capacity();
            fixes += 1;
        }
        if self.hide_peek_margin < 0.0 {
            self.hide_peek_margin = default_hide_peek_margin();
            fixes += 1;
        }
        if self.identity_retry_attempts == 0 {
            self.identity_retry_attempts = 1;
            fixes += 1;
        }

        fixes + self.gaps.auto_fix_values()
    }
}

impl GapSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.outer.validate();
        if self.inner < 0.0 {
            issues.push(format!("inner gap must be non-negative, got {}", self.inner));
        }
        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = self.outer.auto_fix_values();
        if self.inner < 0.0 {
            self.inner = 0.0;
            fixes += 1;
        }
        fixes
    }
}

impl OuterGaps {
    pub fn validate(&self) -> Vec<String> {
        [("top", self.top), ("left", self.left), ("bottom", self.bottom), ("right", self.right)]
            .into_iter()
            .filter(|(_, v)| *v < 0.0)
            .map(|(side, v)| format!("outer.{side} gap must be non-negative, got {v}"))
            .collect()
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;
        for side in [&mut self.top, &mut self.left, &mut self.bottom, &mut self.right] {
            if *side < 0.0 {
                *side = 0.0;
                fixes += 1;
            }
        }
        fixes
    }
}

fn default_workspace_count() -> usize { MAX_WORKSPACES }

fn default_tab_frame_tolerance() -> f64 { DEFAULT_FRAME_TOLERANCE }

fn default_event_queue_capacity() -> usize { 256 }

fn default_hide_peek_margin() -> f64 { 1.0 }

fn default_identity_retry_attempts() -> u32 { 5 }

fn default_identity_retry_delay_ms() -> u64 { 20 }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    /// The file at `path` if it exists, the built-in defaults otherwise.
    pub fn read_or_default(path: &Path) -> anyhow::Result<Config> {
        if path.exists() { Self::read(path) } else { Ok(Self::default()) }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let file = ConfigFile {
            settings: self.settings.clone(),
            workspaces: self.workspaces.clone(),
            app_rules: self.app_rules.clone(),
        };
        let toml_string = toml::to_string_pretty(&file)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;
        Ok(())
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.settings.validate();

        if self.workspaces.names.len() > self.settings.workspace_count {
            issues.push("More workspace names provided than workspace_count".to_string());
        }

        let mut seen = crate::common::collections::HashSet::default();
        for (index, rule) in self.app_rules.iter().enumerate() {
            if rule.app_id.is_empty() {
                issues.push(format!("App rule {index} has an empty app_id"));
            } else if !seen.insert(&rule.app_id) {
                issues.push(format!("Duplicate app_id '{}' in rule {index}", rule.app_id));
            }
            if let Some(ws) = rule.workspace {
                if ws == 0 || ws as usize > self.settings.workspace_count {
                    issues.push(format!(
                        "App rule {index} references workspace {ws} but only {} workspaces exist",
                        self.settings.workspace_count
                    ));
                }
            }
        }

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = self.settings.auto_fix_values();

        let count = self.settings.workspace_count;
        for rule in &mut self.app_rules {
            if rule.workspace.is_some_and(|ws| ws == 0 || ws as usize > count) {
                rule.workspace = None;
                fixes += 1;
            }
        }
        let before = self.app_rules.len();
        self.app_rules.retain(|rule| !rule.app_id.is_empty());
        fixes += before - self.app_rules.len();

        fixes
    }

    pub fn rule_for(&self, app_id: &str) -> Option<&AppRule> {
        self.app_rules.iter().find(|r| r.app_id == app_id)
    }

    fn parse(buf: &str) -> anyhow::Result<Config> {
        let c: ConfigFile = toml::from_str(buf)?;
        Ok(Config {
            settings: c.settings,
            workspaces: c.workspaces,
            app_rules: c.app_rules,
        })
    }
}

impl Default for Config {
    fn default() -> Config {
        Self::parse(include_str!("../../tessel.default.toml")).unwrap_or_else(|_| Config {
            settings: Settings::default(),
            workspaces: WorkspaceSettings::default(),
            app_rules: Vec::new(),
        })
    }
}
