//! Catalog loading and filtering

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::common::{Error, Result};

use super::config::{TestDefinition, TestFile};

/// Load every `*.yaml` file in `dir`, in file-name order
///
/// Each test is stamped with its file's category and display name. Files
/// without a `tests` list are ignored.
pub fn load_tests(dir: &Path) -> Result<Vec<TestDefinition>> {
    if !dir.is_dir() {
        return Err(Error::CatalogNotFound(dir.to_path_buf()));
    }

    let mut all_tests = Vec::new();
    let mut seen_ids = HashSet::new();

    for path in yaml_files(dir)? {
        for test in load_file(&path)? {
            if !seen_ids.insert(test.id.clone()) {
                return Err(Error::catalog_parse(
                    &path,
                    format!("duplicate test id '{}'", test.id),
                ));
            }
            all_tests.push(test);
        }
    }

    if all_tests.is_empty() {
        return Err(Error::CatalogEmpty(dir.to_path_buf()));
    }

    tracing::debug!(count = all_tests.len(), dir = %dir.display(), "Loaded test catalog");
    Ok(all_tests)
}

fn yaml_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| Error::file_read(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "yaml"))
        .collect();
    files.sort();
    Ok(files)
}

fn load_file(path: &Path) -> Result<Vec<TestDefinition>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let file: TestFile =
        serde_yaml::from_str(&content).map_err(|e| Error::catalog_parse(path, e))?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let category = file.category.unwrap_or(stem);
    let display_name = file.display_name.unwrap_or_else(|| category.clone());

    Ok(file
        .tests
        .unwrap_or_default()
        .into_iter()
        .map(|mut test| {
            test.category = category.clone();
            test.display_name = display_name.clone();
            test
        })
        .collect())
}

/// Which tests of the catalog to run
#[derive(Debug, Clone, Default)]
pub struct TestFilter {
    pub platform: String,
    pub category: Option<String>,
    pub test_id: Option<String>,
}

impl TestFilter {
    pub fn matches(&self, test: &TestDefinition) -> bool {
        test.applies_to(&self.platform)
            && self.category.as_ref().map_or(true, |c| &test.category == c)
            && self.test_id.as_ref().map_or(true, |id| &test.id == id)
    }
}

impl fmt::Display for TestFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "platform='{}'", self.platform)?;
        if let Some(category) = &self.category {
            write!(f, ", category='{}'", category)?;
        }
        if let Some(id) = &self.test_id {
            write!(f, ", test='{}'", id)?;
        }
        Ok(())
    }
}

/// Keep the tests matching `filter`, preserving catalog order
pub fn filter_tests(tests: &[TestDefinition], filter: &TestFilter) -> Vec<TestDefinition> {
    tests.iter().filter(|t| filter.matches(t)).cloned().collect()
}

/// Load and filter in one go, failing when nothing matches
pub fn load_filtered(dir: &Path, filter: &TestFilter) -> Result<(Vec<TestDefinition>, usize)> {
    let all_tests = load_tests(dir)?;
    let filtered = filter_tests(&all_tests, filter);
    if filtered.is_empty() {
        return Err(Error::NoMatchingTests(filter.to_string()));
    }
    Ok((filtered, all_tests.len()))
}
