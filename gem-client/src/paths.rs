use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Overrides the install root (normally the executable's directory).
pub const ROOT_ENV: &str = "GEM_ROOT";

/// Fixed file layout shared with the backend scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GemPaths {
    root: PathBuf,
}

impl GemPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `GEM_ROOT` if set, otherwise the directory holding the executable.
    pub fn discover() -> Self {
        if let Some(root) = std::env::var_os(ROOT_ENV) {
            return Self::new(root);
        }

        let root = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir().join("settings.json")
    }

    pub fn suggestion_file(&self) -> PathBuf {
        self.config_dir().join("latest_suggestion.json")
    }

    pub fn summary_ready_file(&self) -> PathBuf {
        self.config_dir().join("summary_ready.json")
    }

    pub fn user_response_file(&self) -> PathBuf {
        self.config_dir().join("user_response.json")
    }

    pub fn manual_summary_file(&self) -> PathBuf {
        self.config_dir().join("manual_summary.json")
    }

    /// Written by the backend, mirrored by the log viewer.
    pub fn backend_log_file(&self) -> PathBuf {
        self.root.join("debug.log")
    }

    pub fn client_log_file(&self) -> PathBuf {
        self.root.join("logs").join("gem-client.log")
    }

    pub fn start_script(&self) -> PathBuf {
        self.root
            .join("backend")
            .join("utility")
            .join("start-assistant.js")
    }

    pub fn stop_script(&self) -> PathBuf {
        self.root
            .join("backend")
            .join("utility")
            .join("stop-assistant.js")
    }

    pub fn ensure_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(self.config_dir())?;
        fs::create_dir_all(self.root.join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_rooted() {
        let paths = GemPaths::new("/opt/gem");
        assert_eq!(
            paths.settings_file(),
            PathBuf::from("/opt/gem/config/settings.json")
        );
        assert_eq!(
            paths.suggestion_file(),
            PathBuf::from("/opt/gem/config/latest_suggestion.json")
        );
        assert_eq!(paths.backend_log_file(), PathBuf::from("/opt/gem/debug.log"));
        assert!(paths.start_script().ends_with("backend/utility/start-assistant.js"));
        assert!(paths.stop_script().ends_with("backend/utility/stop-assistant.js"));
    }

    #[test]
    fn ensure_dirs_creates_config_and_logs() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let paths = GemPaths::new(dir.path());
        paths.ensure_dirs().expect("create dirs");
        assert!(paths.config_dir().is_dir());
        assert!(paths.client_log_file().parent().unwrap().is_dir());
    }
}
