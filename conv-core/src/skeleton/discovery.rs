//! Host-storage discovery (§6): OS-conventional probing for the host
//! agent's per-user `tasks` directories.

use std::path::PathBuf;

use crate::config::EngineConfig;

/// Candidate VS-Code-family editor data directory names, checked under the
/// platform's conventional per-user application-data root.
const EDITOR_VARIANTS: &[&str] = &["Code", "Code - Insiders", "VSCodium"];

/// Candidate extension identifiers that persist task conversations under
/// `globalStorage/<extension-id>/tasks/`.
const EXTENSION_IDS: &[&str] = &["rooveterinaryinc.roo-cline", "saoudrizwan.claude-dev"];

/// Every `tasks` directory found under OS-conventional host-agent storage
/// roots, deduplicated, in discovery order. Honors
/// [`EngineConfig::workspace_root_override`] (`ROO_EXTENSIONS_PATH`): when
/// set, it replaces the per-user application-data root entirely, letting a
/// single path be probed instead of every platform convention.
#[must_use]
pub fn detect_storage_locations(config: &EngineConfig) -> Vec<PathBuf> {
    let roots = if let Some(root) = &config.workspace_root_override {
        vec![root.clone()]
    } else {
        app_data_roots()
    };

    let mut found = Vec::new();
    for root in roots {
        for editor in EDITOR_VARIANTS {
            for extension in EXTENSION_IDS {
                let candidate = root.join(editor).join("User").join("globalStorage").join(extension).join("tasks");
                if candidate.is_dir() && !found.contains(&candidate) {
                    found.push(candidate);
                }
            }
        }
    }
    found
}

/// Platform-conventional per-user application-data roots to probe.
fn app_data_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();

    if let Some(appdata) = std::env::var_os("APPDATA") {
        roots.push(PathBuf::from(appdata));
    }
    if let Some(home) = std::env::var_os("HOME") {
        let home = PathBuf::from(home);
        // Linux XDG convention.
        roots.push(home.join(".config"));
        // macOS convention.
        roots.push(home.join("Library").join("Application Support"));
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn override_root_is_probed_directly() {
        let tmp = TempDir::new().unwrap();
        let tasks_dir = tmp
            .path()
            .join("Code")
            .join("User")
            .join("globalStorage")
            .join("rooveterinaryinc.roo-cline")
            .join("tasks");
        fs::create_dir_all(&tasks_dir).unwrap();

        let mut config = EngineConfig::default();
        config.workspace_root_override = Some(tmp.path().to_path_buf());

        let found = detect_storage_locations(&config);
        assert_eq!(found, vec![tasks_dir]);
    }

    #[test]
    fn no_storage_locations_found_in_empty_override() {
        let tmp = TempDir::new().unwrap();
        let mut config = EngineConfig::default();
        config.workspace_root_override = Some(tmp.path().to_path_buf());
        assert!(detect_storage_locations(&config).is_empty());
    }
}
