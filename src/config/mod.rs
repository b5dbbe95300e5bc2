mod types;

pub use types::*;

use anyhow::{Context, Result};
use mkvert_av::ProfileTable;
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./mkvert.toml",
        "~/.config/mkvert/config.toml",
        "/etc/mkvert/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.tools.timeout_secs == 0 {
        anyhow::bail!("tools.timeout_secs cannot be 0");
    }
    if config.tools.nice > 19 {
        anyhow::bail!("tools.nice must be between 0 and 19, got {}", config.tools.nice);
    }

    // Configured tool paths fall back to PATH, so a stale one is only a warning
    for path in [
        &config.tools.paths.mkvmerge_path,
        &config.tools.paths.mkvextract_path,
        &config.tools.paths.ass2srt_path,
        &config.tools.paths.ffmpeg_path,
        &config.tools.paths.subler_path,
        &config.tools.paths.mencoder_path,
    ]
    .into_iter()
    .flatten()
    {
        if !path.exists() {
            tracing::warn!("Configured tool path does not exist: {:?}", path);
        }
    }

    let transcode = &config.transcode;
    if transcode.video_crf > 51 {
        anyhow::bail!(
            "transcode.video_crf must be between 0 and 51, got {}",
            transcode.video_crf
        );
    }
    if transcode.max_width == 0 || transcode.max_height == 0 {
        anyhow::bail!("transcode.max_width and transcode.max_height must be positive");
    }

    ProfileTable::get(&config.encode.profile)
        .with_context(|| format!("Invalid encode.profile '{}'", config.encode.profile))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.tools.timeout_secs, 300);
        assert_eq!(config.tools.transcode_timeout(), None);
        assert_eq!(config.transcode.video_crf, 20);
        assert_eq!(config.encode.profile, "ipod");
        assert!(!config.encode.two_pass);
    }

    #[test]
    fn test_tool_paths_are_flattened() {
        let file = write_config(
            r#"
[tools]
mkvmerge_path = "/opt/mkvtoolnix/mkvmerge"
transcode_timeout_secs = 7200
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(
            config.tools.paths.mkvmerge_path.as_deref(),
            Some(Path::new("/opt/mkvtoolnix/mkvmerge"))
        );
        assert_eq!(
            config.tools.transcode_timeout(),
            Some(std::time::Duration::from_secs(7200))
        );
    }

    #[test]
    fn test_rejects_out_of_range_crf() {
        let file = write_config("[transcode]\nvideo_crf = 60\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("video_crf"));
    }

    #[test]
    fn test_rejects_unknown_profile() {
        let file = write_config("[encode]\nprofile = \"psp\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("psp"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let file = write_config("[tools]\ntimeout_secs = 0\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_nice_level() {
        let file = write_config("[tools]\nnice = 5\n");
        assert_eq!(load_config(file.path()).unwrap().tools.nice, 5);

        let file = write_config("[tools]\nnice = 20\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("tools.nice"));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        assert!(load_config_or_default(Some(Path::new("/nonexistent/mkvert.toml"))).is_err());
    }
}
