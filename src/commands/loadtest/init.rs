//! `flight-loadgen loadtest init` command implementation.

use anyhow::Result;
use std::path::{Path, PathBuf};

use flight_loadgen::loadtest::config::{CONFIG_DIR, CONFIG_FILE, STARTER_CONFIG};

/// Execute the `loadtest init` command.
///
/// Creates `.flight-loadgen/loadtest.toml` under `base_dir` with sensible
/// defaults and returns its path. Refuses to overwrite unless `force` is set.
pub fn execute_init(base_dir: &Path, force: bool) -> Result<PathBuf> {
    let config_dir = base_dir.join(CONFIG_DIR);
    let config_path = config_dir.join(CONFIG_FILE);

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}\n\
             Use `--force` to overwrite.",
            config_path.display()
        );
    }

    std::fs::create_dir_all(&config_dir)?;
    std::fs::write(&config_path, STARTER_CONFIG)?;
    eprintln!("Created {}", config_path.display());
    eprintln!("Edit the file to set your tenants and dataset.");

    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flight_loadgen::loadtest::config::LoadTestConfig;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = execute_init(dir.path(), false).unwrap();

        assert!(path.ends_with(Path::new(CONFIG_DIR).join(CONFIG_FILE)));
        let config = LoadTestConfig::load(&path).unwrap();
        assert_eq!(config.settings.concurrency, 10);
    }

    #[test]
    fn test_init_refuses_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = execute_init(dir.path(), false).unwrap();
        std::fs::write(&path, "# edited").unwrap();

        let err = execute_init(dir.path(), false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# edited");

        execute_init(dir.path(), true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), STARTER_CONFIG);
    }
}
