//! Configuration file loading

use anyhow::Context as _;
use sqlperf_check::CheckConfig;
use std::path::Path;

/// Read and parse the TOML configuration at `path`
pub fn load(path: &Path) -> anyhow::Result<CheckConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    let config = CheckConfig::from_toml(&content)
        .with_context(|| format!("invalid config file {}", path.display()))?;

    if config.instances.is_empty() {
        tracing::warn!(path = %path.display(), "no instances configured");
    }
    tracing::info!(
        path = %path.display(),
        instances = config.instances.len(),
        custom_metrics = config.init_config.custom_metrics.len(),
        "configuration loaded"
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            indoc! {r#"
                [init_config]
                min_collection_interval = 20

                [[instances]]
                host = "db1;1433"
                username = "sqlperf"
                password = "secret"
                tags = ["env:prod"]
            "#}
            .as_bytes(),
        )
        .unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(config.init_config.min_collection_interval, 20);
        assert_eq!(config.instances.len(), 1);
        assert_eq!(config.instances[0].database, "master");
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[test]
    fn test_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[[instances]]\nhost = 1433\n").unwrap();

        let err = load(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("invalid config file"));
    }
}
