//! Finding the newest result bundle for a project and scheme in DerivedData.
//!
//! DerivedData holds one directory per project build, named like
//! `Client-csljdukzqbozahdjizcvrfiufrkb`. Each has a `Logs/Test` directory
//! with one `.xcresult` bundle per test run, named like
//! `Run-ClientTests-2024.01.31_10-12-00-+0000.xcresult`.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Test bundles directory, relative to a project's DerivedData directory.
const TEST_LOGS_DIR: &str = "Logs/Test";

/// List `dir` and return the newest entry whose name matches `prefix`.
///
/// `prefix` is matched at the start of the file name. Returns `Ok(None)`
/// when nothing matches.
pub fn find_newest_matching_prefix(
    dir: &Path,
    prefix: &Regex,
) -> Result<Option<PathBuf>, LocateError> {
    let entries = std::fs::read_dir(dir).map_err(|e| LocateError::ReadDir {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry.map_err(|e| LocateError::ReadDir {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !prefix.find(name).is_some_and(|m| m.start() == 0) {
            continue;
        }

        let path = entry.path();
        let mtime = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .map_err(|e| LocateError::ReadDir {
                path: path.clone(),
                source: e,
            })?;

        // Strictly newer only: ties keep the first entry listed.
        let is_newer = match &newest {
            Some((t, _)) => mtime > *t,
            None => true,
        };
        if is_newer {
            newest = Some((mtime, path));
        }
    }

    Ok(newest.map(|(_, path)| path))
}

/// Find the newest DerivedData directory for `project` under `derived_data`.
pub fn find_project_path(derived_data: &Path, project: &str) -> Result<PathBuf, LocateError> {
    let prefix = project_prefix(project);
    let result = find_newest_matching_prefix(derived_data, &prefix)?.ok_or_else(|| {
        LocateError::ProjectNotFound {
            project: project.to_string(),
            dir: derived_data.to_path_buf(),
        }
    })?;

    tracing::debug!(path = %result.display(), "using project derived data");
    Ok(result)
}

/// Find the newest xcresult bundle for `project` and `scheme`.
pub fn find_xcresult_path(
    derived_data: &Path,
    project: &str,
    scheme: &str,
) -> Result<PathBuf, LocateError> {
    let project_path = find_project_path(derived_data, project)?;
    let bundle_dir = project_path.join(TEST_LOGS_DIR);
    let prefix = scheme_prefix(scheme);

    tracing::debug!(dir = %bundle_dir.display(), "looking for xcresult bundles");
    let xcresult = find_newest_matching_prefix(&bundle_dir, &prefix)?.ok_or_else(|| {
        LocateError::BundleNotFound {
            scheme: scheme.to_string(),
            dir: bundle_dir.clone(),
        }
    })?;

    tracing::debug!(path = %xcresult.display(), "found xcresult");
    Ok(xcresult)
}

fn project_prefix(project: &str) -> Regex {
    // Escaped input always yields a valid pattern.
    Regex::new(&format!("{}-", regex::escape(project))).unwrap()
}

fn scheme_prefix(scheme: &str) -> Regex {
    Regex::new(&format!("([^-]*)-{}-", regex::escape(scheme))).unwrap()
}

/// Errors from locating a result bundle.
#[derive(Debug)]
pub enum LocateError {
    /// A directory to search, or a matching entry in it, could not be read.
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// No DerivedData directory matches the project.
    ProjectNotFound { project: String, dir: PathBuf },
    /// No bundle in the project's test logs matches the scheme.
    BundleNotFound { scheme: String, dir: PathBuf },
}

impl std::fmt::Display for LocateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocateError::ReadDir { path, source } => {
                write!(f, "could not read {}: {source}", path.display())
            }
            LocateError::ProjectNotFound { project, dir } => write!(
                f,
                "could not find project derived data for {project} in {}",
                dir.display()
            ),
            LocateError::BundleNotFound { scheme, dir } => write!(
                f,
                "could not find xcresult bundle for {scheme} in {}",
                dir.display()
            ),
        }
    }
}

impl std::error::Error for LocateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LocateError::ReadDir { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};

    fn touch(path: &Path, secs: i64) {
        std::fs::create_dir_all(path).unwrap();
        set_file_mtime(path, FileTime::from_unix_time(secs, 0)).unwrap();
    }

    #[test]
    fn test_newest_matching_prefix_picks_latest() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Client-aaa"), 1_000);
        touch(&dir.path().join("Client-bbb"), 2_000);

        let result = find_newest_matching_prefix(dir.path(), &project_prefix("Client")).unwrap();
        assert_eq!(result, Some(dir.path().join("Client-bbb")));
    }

    #[test]
    fn test_newest_matching_prefix_ignores_non_matching() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Client-aaa"), 1_000);
        touch(&dir.path().join("OtherClient-zzz"), 9_000);
        touch(&dir.path().join("ClientKit-yyy"), 9_000);

        let result = find_newest_matching_prefix(dir.path(), &project_prefix("Client")).unwrap();
        assert_eq!(result, Some(dir.path().join("Client-aaa")));
    }

    #[test]
    fn test_newest_matching_prefix_none() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Other-aaa"), 1_000);
        let result = find_newest_matching_prefix(dir.path(), &project_prefix("Client")).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("DerivedData");
        let err = find_newest_matching_prefix(&missing, &project_prefix("Client")).unwrap_err();
        assert!(matches!(err, LocateError::ReadDir { .. }));
        assert!(err.to_string().contains("DerivedData"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_matching_entry_is_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Client-aaa"), 1_000);
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("Client-broken"))
            .unwrap();

        let err = find_newest_matching_prefix(dir.path(), &project_prefix("Client")).unwrap_err();
        match &err {
            LocateError::ReadDir { path, .. } => {
                assert_eq!(path, &dir.path().join("Client-broken"))
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(std::error::Error::source(&err).is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_non_matching_entry_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("Client-aaa"), 1_000);
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("Other-broken"))
            .unwrap();

        let result = find_newest_matching_prefix(dir.path(), &project_prefix("Client")).unwrap();
        assert_eq!(result, Some(dir.path().join("Client-aaa")));
    }

    #[test]
    fn test_project_name_is_escaped() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("AxB-aaa"), 1_000);
        touch(&dir.path().join("A.B-bbb"), 500);
        let result = find_project_path(dir.path(), "A.B").unwrap();
        assert_eq!(result, dir.path().join("A.B-bbb"));
    }

    #[test]
    fn test_find_project_path_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_project_path(dir.path(), "Client").unwrap_err();
        assert!(matches!(err, LocateError::ProjectNotFound { .. }));
        assert!(err
            .to_string()
            .contains("could not find project derived data for Client"));
    }

    #[test]
    fn test_find_xcresult_path() {
        let dd = tempfile::tempdir().unwrap();
        touch(&dd.path().join("Client-old"), 100);
        let project = dd.path().join("Client-new");
        touch(&project, 200);
        let logs = project.join("Logs/Test");
        touch(&logs.join("Run-ClientTests-2024.01.01.xcresult"), 1_000);
        touch(&logs.join("Run-ClientTests-2024.02.01.xcresult"), 2_000);
        touch(&logs.join("Run-OtherTests-2024.03.01.xcresult"), 3_000);
        // Scheme must be followed by a dash.
        touch(&logs.join("Run-ClientTestsUI-2024.04.01.xcresult"), 4_000);

        let result = find_xcresult_path(dd.path(), "Client", "ClientTests").unwrap();
        assert_eq!(result, logs.join("Run-ClientTests-2024.02.01.xcresult"));
    }

    #[test]
    fn test_find_xcresult_path_no_bundle() {
        let dd = tempfile::tempdir().unwrap();
        let logs = dd.path().join("Client-abc/Logs/Test");
        touch(&logs.join("Run-OtherTests-2024.03.01.xcresult"), 3_000);

        let err = find_xcresult_path(dd.path(), "Client", "ClientTests").unwrap_err();
        assert!(matches!(err, LocateError::BundleNotFound { .. }));
        assert!(err
            .to_string()
            .contains("could not find xcresult bundle for ClientTests"));
    }

    #[test]
    fn test_find_xcresult_path_missing_logs_dir() {
        let dd = tempfile::tempdir().unwrap();
        touch(&dd.path().join("Client-abc"), 100);
        let err = find_xcresult_path(dd.path(), "Client", "ClientTests").unwrap_err();
        assert!(matches!(err, LocateError::ReadDir { .. }));
    }

    #[test]
    fn test_scheme_prefix_matches_at_start_only() {
        let re = scheme_prefix("Perf");
        let starts = |name: &str| re.find(name).is_some_and(|m| m.start() == 0);
        assert!(starts("Test-Perf-2024.xcresult"));
        assert!(starts("-Perf-2024.xcresult"));
        assert!(!starts("Test-Run-Perf-2024.xcresult"));
        assert!(!starts("Test-PerfUI-2024.xcresult"));
    }
}
