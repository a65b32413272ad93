use crate::model::Settings;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_DIR: &str = ".taskgraph";
pub const SETTINGS_FILE: &str = "settings.yml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsScope {
    Vault,
    Global,
    Explicit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFormat {
    Yaml,
    Json,
}

#[derive(Debug, Clone)]
pub struct SettingsLocation {
    pub path: PathBuf,
    pub scope: SettingsScope,
}

impl SettingsLocation {
    pub fn explicit(path: impl Into<PathBuf>) -> Self {
        SettingsLocation {
            path: path.into(),
            scope: SettingsScope::Explicit,
        }
    }

    pub fn format(&self) -> SettingsFormat {
        match self.path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SettingsFormat::Json,
            _ => SettingsFormat::Yaml,
        }
    }

    /// Directory holding the `.taskgraph` folder for vault-scoped settings.
    pub fn vault_root(&self) -> Option<&Path> {
        match self.scope {
            SettingsScope::Vault => self.path.parent().and_then(|p| p.parent()),
            _ => None,
        }
    }
}

pub fn init_vault_settings(vault_root: &Path) -> Result<SettingsLocation> {
    let dir = vault_root.join(SETTINGS_DIR);
    fs::create_dir_all(&dir).context("failed to create .taskgraph directory")?;
    let location = SettingsLocation {
        path: dir.join(SETTINGS_FILE),
        scope: SettingsScope::Vault,
    };
    if !location.path.exists() {
        save_settings(&location, &Settings::default())?;
    }
    Ok(location)
}

pub fn locate_settings(start: &Path) -> Result<SettingsLocation> {
    if let Some(vault_path) = find_vault_settings(start) {
        return Ok(SettingsLocation {
            path: vault_path,
            scope: SettingsScope::Vault,
        });
    }
    Ok(SettingsLocation {
        path: global_settings_path()?,
        scope: SettingsScope::Global,
    })
}

/// Loads settings merged over the defaults. A missing file yields (and
/// writes) the default settings.
pub fn load_settings(location: &SettingsLocation) -> Result<Settings> {
    if !location.path.exists() {
        let settings = Settings::default();
        save_settings(location, &settings)?;
        return Ok(settings);
    }
    let data = fs::read_to_string(&location.path)
        .with_context(|| format!("reading {:?}", location.path))?;
    let mut settings: Settings = if data.trim().is_empty() {
        Settings::default()
    } else {
        match location.format() {
            SettingsFormat::Json => serde_json::from_str(&data).context("parsing settings file")?,
            SettingsFormat::Yaml => serde_yaml::from_str(&data).context("parsing settings file")?,
        }
    };
    settings.normalize();
    Ok(settings)
}

/// Writes through a sibling temp file and renames it over the target.
pub fn save_settings(location: &SettingsLocation, settings: &Settings) -> Result<()> {
    if let Some(parent) = location.path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = match location.format() {
        SettingsFormat::Json => {
            serde_json::to_string_pretty(settings).context("serializing settings")?
        }
        SettingsFormat::Yaml => serde_yaml::to_string(settings).context("serializing settings")?,
    };
    let tmp = location.path.with_extension("tmp");
    fs::write(&tmp, serialized).with_context(|| format!("writing {:?}", tmp))?;
    fs::rename(&tmp, &location.path)
        .with_context(|| format!("replacing {:?}", location.path))?;
    Ok(())
}

fn find_vault_settings(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(SETTINGS_DIR).join(SETTINGS_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn global_settings_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "taskgraph").context("locating data directory")?;
    Ok(dirs.data_dir().join(SETTINGS_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Board, Edge};

    #[test]
    fn init_then_locate_from_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("Projects/deep");
        fs::create_dir_all(&nested).unwrap();
        let created = init_vault_settings(dir.path()).unwrap();
        let found = locate_settings(&nested).unwrap();
        assert_eq!(found.scope, SettingsScope::Vault);
        assert_eq!(found.path, created.path);
        assert_eq!(found.vault_root(), Some(dir.path()));
    }

    #[test]
    fn yaml_round_trip_preserves_boards() {
        let dir = tempfile::tempdir().unwrap();
        let location = SettingsLocation::explicit(dir.path().join("settings.yml"));
        let mut settings = Settings::default();
        let mut board = Board::new("work", "Work");
        board.data.edges.push(Edge::new("a.md::^x", "b.md::#y"));
        settings.boards.push(board);
        save_settings(&location, &settings).unwrap();
        assert_eq!(load_settings(&location).unwrap(), settings);
    }

    #[test]
    fn json_files_are_read_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, r#"{"boards": [], "lastActiveBoardId": "gone"}"#).unwrap();
        let location = SettingsLocation::explicit(&path);
        assert_eq!(location.format(), SettingsFormat::Json);
        let settings = load_settings(&location).unwrap();
        assert_eq!(settings.boards.len(), 1);
        assert_eq!(settings.active_board().id, "default");
    }

    #[test]
    fn missing_or_empty_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let location = SettingsLocation::explicit(dir.path().join("settings.yml"));
        assert_eq!(load_settings(&location).unwrap(), Settings::default());
        assert!(location.path.exists());
        fs::write(&location.path, "").unwrap();
        assert_eq!(load_settings(&location).unwrap(), Settings::default());
    }
}
