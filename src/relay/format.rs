//! Small formatting helpers for status lines.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// `340ms`, `1.3s`, `2m 5s`.
pub fn humanize_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms < 1_000 {
        return format!("{}ms", ms);
    }
    if ms < 60_000 {
        let tenths = (ms + 50) / 100;
        return format!("{}.{}s", tenths / 10, tenths % 10);
    }
    let secs = (ms + 500) / 1_000;
    format!("{}m {}s", secs / 60, secs % 60)
}

/// `path` relative to `base` when it lies under it, otherwise unchanged.
pub fn relative_id(path: &Path, base: &Path) -> String {
    if path.is_absolute() {
        if let Ok(relative) = path.strip_prefix(base) {
            return relative.display().to_string();
        }
    }
    path.display().to_string()
}

/// Output paths relative to `base`, joined with `", "`.
pub fn join_paths(paths: &[PathBuf], base: &Path) -> String {
    paths
        .iter()
        .map(|path| relative_id(path, base))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Local wall-clock time for the waiting footer.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize_duration() {
        assert_eq!(humanize_duration(Duration::from_millis(340)), "340ms");
        assert_eq!(humanize_duration(Duration::from_millis(1_250)), "1.3s");
        assert_eq!(humanize_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_relative_id() {
        let base = Path::new("/work/project");
        assert_eq!(relative_id(Path::new("/work/project/dist/a.js"), base), "dist/a.js");
        assert_eq!(relative_id(Path::new("/elsewhere/a.js"), base), "/elsewhere/a.js");
        assert_eq!(relative_id(Path::new("dist/b.js"), base), "dist/b.js");
    }

    #[test]
    fn test_join_paths() {
        let base = Path::new("/work");
        let paths = vec![PathBuf::from("/work/a.js"), PathBuf::from("b.js")];
        assert_eq!(join_paths(&paths, base), "a.js, b.js");
    }
}
