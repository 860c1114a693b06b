use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub const MIN_REFRESH_MS: u64 = 500;
const MAX_ALIAS_HOPS: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfigSnapshot {
    pub source: Option<String>,
    pub aliases: HashMap<String, String>,
    pub refresh_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfigWatcher {
    path: Option<PathBuf>,
    modified: Option<SystemTime>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct KrillConfigFile {
    #[serde(default)]
    aliases: BTreeMap<String, String>,
    #[serde(default, alias = "refreshMs", alias = "refresh")]
    refresh_ms: Option<u64>,
}

impl RuntimeConfigWatcher {
    pub fn discover() -> Self {
        Self {
            path: discover_config_path(),
            modified: None,
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn load_current(&mut self) -> Result<RuntimeConfigSnapshot> {
        let Some(path) = self.path.clone() else {
            return Ok(RuntimeConfigSnapshot::default());
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read runtime config {}", path.display()))?;
        let mut snapshot = parse_config(&raw)
            .with_context(|| format!("failed to parse runtime config {}", path.display()))?;
        self.modified = fs::metadata(&path)
            .ok()
            .and_then(|meta| meta.modified().ok());

        snapshot.source = Some(path.display().to_string());
        Ok(snapshot)
    }

    /// Re-reads the file when its modification time moved or when a config
    /// file appeared or vanished since the last load.
    pub fn reload_if_changed(&mut self) -> Result<Option<RuntimeConfigSnapshot>> {
        let Some(current_path) = self.path.clone() else {
            self.path = discover_config_path();
            if self.path.is_some() {
                return self.load_current().map(Some);
            }
            return Ok(None);
        };

        if !current_path.exists() {
            self.path = discover_config_path();
            self.modified = None;
            if self.path.is_some() {
                return self.load_current().map(Some);
            }
            return Ok(Some(RuntimeConfigSnapshot::default()));
        }

        let modified = fs::metadata(&current_path)
            .ok()
            .and_then(|meta| meta.modified().ok());
        if modified != self.modified {
            return self.load_current().map(Some);
        }

        Ok(None)
    }
}

fn parse_config(raw: &str) -> Result<RuntimeConfigSnapshot> {
    if raw.trim().is_empty() {
        return Ok(RuntimeConfigSnapshot::default());
    }

    let parsed: KrillConfigFile = serde_yaml::from_str(raw)?;
    let aliases = parsed
        .aliases
        .into_iter()
        .map(|(alias, command)| {
            (
                alias.trim().to_ascii_lowercase(),
                command.trim().to_string(),
            )
        })
        .filter(|(alias, command)| !alias.is_empty() && !command.is_empty())
        .collect::<HashMap<_, _>>();

    Ok(RuntimeConfigSnapshot {
        source: None,
        aliases,
        refresh_ms: parsed.refresh_ms.map(|ms| ms.max(MIN_REFRESH_MS)),
    })
}

/// Refresh interval in effect: the config file's value when it sets one,
/// otherwise the command line's. Both are floored.
pub fn refresh_interval(cli_ms: u64, configured: Option<u64>) -> u64 {
    configured.unwrap_or(cli_ms).max(MIN_REFRESH_MS)
}

/// Follows user aliases for a command token. Chains stop after a fixed number
/// of hops so that a cycle resolves to wherever it stopped.
pub fn resolve_alias(aliases: &HashMap<String, String>, token: &str) -> String {
    let mut current = token.trim().to_string();
    for _ in 0..MAX_ALIAS_HOPS {
        match aliases.get(&current.to_ascii_lowercase()) {
            Some(next) if *next != current => current = next.clone(),
            _ => break,
        }
    }
    current
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("KRILL_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("krill.yaml"),
        PathBuf::from("krill.yml"),
        PathBuf::from(".krill.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let candidate = PathBuf::from(home).join(".config/krill/config.yaml");
        if candidate.exists() {
            return Some(candidate);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::{MIN_REFRESH_MS, parse_config, refresh_interval, resolve_alias};
    use std::collections::HashMap;

    #[test]
    fn parses_aliases_and_refresh() {
        let snapshot = parse_config(
            "aliases:\n  Web: deploy prod\n  dp: deploy\nrefresh_ms: 3000\n",
        )
        .expect("valid config");

        assert_eq!(
            snapshot.aliases.get("web").map(String::as_str),
            Some("deploy prod")
        );
        assert_eq!(snapshot.aliases.get("dp").map(String::as_str), Some("deploy"));
        assert_eq!(snapshot.refresh_ms, Some(3000));
    }

    #[test]
    fn refresh_interval_has_a_floor() {
        let snapshot = parse_config("refresh_ms: 10\n").expect("valid config");
        assert_eq!(snapshot.refresh_ms, Some(MIN_REFRESH_MS));
    }

    #[test]
    fn removed_refresh_falls_back_to_command_line() {
        assert_eq!(refresh_interval(2000, Some(3000)), 3000);
        assert_eq!(refresh_interval(2000, None), 2000);
        assert_eq!(refresh_interval(100, None), MIN_REFRESH_MS);

        let without_key = parse_config("aliases:\n  w: deploy\n").expect("valid config");
        assert_eq!(refresh_interval(2000, without_key.refresh_ms), 2000);
    }

    #[test]
    fn empty_file_is_default() {
        let snapshot = parse_config("  \n").expect("empty config");
        assert!(snapshot.aliases.is_empty());
        assert_eq!(snapshot.refresh_ms, None);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(parse_config("aliases: [unclosed").is_err());
    }

    #[test]
    fn alias_chains_resolve_and_cycles_terminate() {
        let aliases = HashMap::from([
            ("w".to_string(), "web".to_string()),
            ("web".to_string(), "deploy".to_string()),
            ("a".to_string(), "b".to_string()),
            ("b".to_string(), "a".to_string()),
        ]);

        assert_eq!(resolve_alias(&aliases, "w"), "deploy");
        assert_eq!(resolve_alias(&aliases, "pods"), "pods");
        let cyclic = resolve_alias(&aliases, "a");
        assert!(cyclic == "a" || cyclic == "b");
    }
}
