// Reads the installed version of a local Splunk app from its app.conf.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ini::{Ini, ParseOption};

/// `<app_dir>/default/app.conf`
pub fn app_conf_path(app_dir: &Path) -> PathBuf {
    app_dir.join("default").join("app.conf")
}

/// Value of `[launcher] version` in the app's `default/app.conf`.
pub fn installed_version(app_dir: &Path) -> Result<String> {
    let path = app_conf_path(app_dir);
    // app.conf values are literal text: no backslash escapes, no quoting.
    let options = ParseOption {
        enabled_escape: false,
        enabled_quote: false,
        ..ParseOption::default()
    };
    let conf = Ini::load_from_file_opt(&path, options)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let version = conf
        .section(Some("launcher"))
        .and_then(|section| section.get("version"))
        .with_context(|| format!("No [launcher] version in {}", path.display()))?;
    Ok(version.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_conf(dir: &Path, body: &str) {
        fs::create_dir_all(dir.join("default")).unwrap();
        fs::write(app_conf_path(dir), body).unwrap();
    }

    #[test]
    fn test_reads_launcher_version() {
        let dir = tempfile::tempdir().unwrap();
        write_conf(
            dir.path(),
            "# generated\n[install]\nis_configured = 0\n\n[launcher]\nauthor = Someone\nversion = 2.0.1\n",
        );
        assert_eq!(installed_version(dir.path()).unwrap(), "2.0.1");
    }

    #[test]
    fn test_backslashes_and_quotes_are_literal() {
        let dir = tempfile::tempdir().unwrap();
        write_conf(
            dir.path(),
            "[launcher]\ndescription = Reads C:\\xlogs\\app\nlabel = Splunk's Add-on\nversion = 2.0.1\n",
        );
        assert_eq!(installed_version(dir.path()).unwrap(), "2.0.1");
    }

    #[test]
    fn test_missing_version() {
        let dir = tempfile::tempdir().unwrap();
        write_conf(dir.path(), "[ui]\nis_visible = 1\n");
        assert!(installed_version(dir.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(installed_version(dir.path()).is_err());
    }
}
