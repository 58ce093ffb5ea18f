//! Configuration validation utilities.

use std::fs;
use std::path::{Path, PathBuf};

use td_core::data::GameConfig;
use td_core::error::GameError;
use td_core::simulation::Simulation;
use thiserror::Error;

/// Error type for tool operations.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Reading or writing a file failed.
    #[error("{path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A file did not parse or could not be rendered.
    #[error(transparent)]
    Game(#[from] GameError),
    /// A file parsed but is not a usable configuration.
    #[error("{path}: {problems:?}")]
    Invalid {
        /// File involved.
        path: PathBuf,
        /// Every problem found.
        problems: Vec<String>,
    },
    /// A directory held no configuration files.
    #[error("no .ron files in {0}")]
    Empty(PathBuf),
}

/// Parse and validate one configuration file.
///
/// Beyond the table checks, the configuration must build a session.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or fails validation.
pub fn validate_file(path: &Path) -> Result<GameConfig, ToolError> {
    let text = fs::read_to_string(path).map_err(|source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = GameConfig::from_ron_str(&path.display().to_string(), &text)?;

    let problems = config.validate();
    if !problems.is_empty() {
        return Err(ToolError::Invalid {
            path: path.to_path_buf(),
            problems,
        });
    }
    Simulation::new(config.clone())?;

    tracing::debug!(
        path = %path.display(),
        towers = config.towers.len(),
        enemies = config.enemies.len(),
        waves = config.waves.len(),
        "Configuration valid"
    );
    Ok(config)
}

/// Validate a configuration file, or every `.ron` file in a directory.
///
/// Returns the files checked, in name order.
///
/// # Errors
///
/// Returns the first failure; a directory with no `.ron` files is an error.
pub fn validate_path(path: &Path) -> Result<Vec<PathBuf>, ToolError> {
    if !path.is_dir() {
        validate_file(path)?;
        return Ok(vec![path.to_path_buf()]);
    }

    let io_error = |source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(path).map_err(io_error)? {
        let file = entry.map_err(io_error)?.path();
        if file.extension().is_some_and(|ext| ext == "ron") {
            files.push(file);
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(ToolError::Empty(path.to_path_buf()));
    }
    for file in &files {
        validate_file(file)?;
    }
    Ok(files)
}

/// Render the built-in configuration as RON.
///
/// # Errors
///
/// Returns an error if RON serialization fails.
pub fn default_config_ron() -> Result<String, ToolError> {
    Ok(GameConfig::default().to_ron_string()?)
}

/// Write the built-in configuration to `path`.
///
/// # Errors
///
/// Returns an error if rendering or writing fails.
pub fn write_default_config(path: &Path) -> Result<(), ToolError> {
    let text = default_config_ron()?;
    fs::write(path, text).map_err(|source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    })
}
