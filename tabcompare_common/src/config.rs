use crate::{AppConfig, MappingDesc, TabCompareError};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "tabcompare.toml";

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
    pub exists: bool,
    pub portable: bool,
}

pub fn load_config(prefer_portable: bool) -> Result<LoadedConfig, TabCompareError> {
    let (path, portable) = resolve_config_path(prefer_portable)?;
    let exists = path.exists();

    let mut config = if exists {
        let data = fs::read_to_string(&path)?;
        toml::from_str(&data).map_err(|e| TabCompareError::Serialization(e.to_string()))?
    } else {
        AppConfig::default()
    };

    config.portable_mode = portable;

    Ok(LoadedConfig {
        config,
        path,
        exists,
        portable,
    })
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), TabCompareError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let data = toml::to_string_pretty(config)
        .map_err(|e| TabCompareError::Serialization(e.to_string()))?;
    fs::write(path, data)?;
    Ok(())
}

/// Directory for reports when neither the command line nor the config names one
pub fn default_output_dir(portable: bool, config_path: &Path) -> Result<PathBuf, TabCompareError> {
    if portable {
        let base = config_path
            .parent()
            .map(|path| path.to_path_buf())
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        return Ok(base.join("tabcompare_reports"));
    }

    let dirs = ProjectDirs::from("", "aecs4u", "tabcompare")
        .ok_or_else(|| TabCompareError::Config("Unable to determine data directory".to_string()))?;
    Ok(dirs.data_dir().join("reports"))
}

/// Reads a column mapping from a TOML file of `[[fields]]` tables
pub fn load_mapping(path: &Path) -> Result<MappingDesc, TabCompareError> {
    let data = fs::read_to_string(path)?;
    toml::from_str(&data).map_err(|e| {
        TabCompareError::Config(format!("Invalid mapping file {}: {}", path.display(), e))
    })
}

fn resolve_config_path(prefer_portable: bool) -> Result<(PathBuf, bool), TabCompareError> {
    if let Some(portable_path) = portable_config_path() {
        if prefer_portable || portable_path.exists() {
            return Ok((portable_path, true));
        }
    }

    let dirs = ProjectDirs::from("", "aecs4u", "tabcompare")
        .ok_or_else(|| TabCompareError::Config("Unable to determine config directory".to_string()))?;
    Ok((dirs.config_dir().join(CONFIG_FILE_NAME), false))
}

fn portable_config_path() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
}
