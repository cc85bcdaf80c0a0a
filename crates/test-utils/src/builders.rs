use cvsync::config::Settings;

/// Settings tuned for tests: no inter-call throttle, otherwise defaults.
pub fn fast_settings() -> Settings {
    Settings {
        min_call_interval_ms: 0,
        ..Settings::default()
    }
}

/// Settings with a given worker width and no throttle.
pub fn fast_settings_with_width(max_parallel: usize) -> Settings {
    Settings {
        max_parallel,
        ..fast_settings()
    }
}

/// Write a file under `dir`, creating it if needed. Panics on IO errors,
/// which is what we want in test setup.
pub fn write_file(dir: &std::path::Path, name: &str, contents: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("writing test file");
    path
}
