//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_scenario;
pub use validate::run_validate;

use std::path::Path;

use contracts::ProviderConfig;

use crate::error::{CliError, Result};

/// Load and validate a configuration file
pub(crate) fn load_config(path: &Path) -> Result<ProviderConfig> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }
    Ok(config_loader::ConfigLoader::load_from_path(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/provider.toml")).unwrap_err();
        assert!(matches!(err, CliError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_load_config_invalid() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[spawn]\nrunning_probability = 3.0").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }
}
