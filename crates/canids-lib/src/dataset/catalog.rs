//! Category key to dataset file mapping

use crate::models::CategoryInfo;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default CAN traffic profiles and their extracted-feature files
pub const DEFAULT_DATASETS: [(&str, &str); 4] = [
    (
        "Attack-Free",
        "extracted_feature/CAN_attack_dataset1/Attack_free_new.csv",
    ),
    (
        "DoS",
        "extracted_feature/CAN_attack_dataset1/DoS_Attack_new.csv",
    ),
    (
        "Fuzzy",
        "extracted_feature/CAN_attack_dataset1/Fuzzy_Attack_New.csv",
    ),
    (
        "Impersonation",
        "extracted_feature/CAN_attack_dataset1/Impersonation_Attack_New.csv",
    ),
];

/// Static mapping from client-visible category keys to dataset files
#[derive(Debug, Clone, Default)]
pub struct DatasetCatalog {
    entries: BTreeMap<String, PathBuf>,
}

impl DatasetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four CAN categories, resolved relative to `root`
    pub fn can_defaults(root: impl AsRef<Path>) -> Self {
        DEFAULT_DATASETS
            .iter()
            .map(|(key, path)| (key.to_string(), root.as_ref().join(path)))
            .collect()
    }

    pub fn with_entry(mut self, key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.insert(key, path);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, path: impl Into<PathBuf>) {
        self.entries.insert(key.into(), path.into());
    }

    /// Exact, case-sensitive key lookup
    pub fn resolve(&self, key: &str) -> Option<&Path> {
        self.entries.get(key).map(PathBuf::as_path)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys with whether their file currently exists
    pub fn categories(&self) -> Vec<CategoryInfo> {
        self.entries
            .iter()
            .map(|(key, path)| CategoryInfo {
                key: key.clone(),
                available: path.is_file(),
            })
            .collect()
    }

    /// Keys whose dataset file is missing
    pub fn missing(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, path)| !path.is_file())
            .map(|(key, _)| key.as_str())
            .collect()
    }
}

impl FromIterator<(String, PathBuf)> for DatasetCatalog {
    fn from_iter<I: IntoIterator<Item = (String, PathBuf)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_can_defaults_cover_known_categories() {
        let catalog = DatasetCatalog::can_defaults("/data");
        let keys: Vec<&str> = catalog.keys().collect();
        assert_eq!(keys, vec!["Attack-Free", "DoS", "Fuzzy", "Impersonation"]);
        assert_eq!(
            catalog.resolve("DoS"),
            Some(Path::new(
                "/data/extracted_feature/CAN_attack_dataset1/DoS_Attack_new.csv"
            ))
        );
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        let catalog = DatasetCatalog::new().with_entry("DoS", "dos.csv");
        assert!(catalog.resolve("DoS").is_some());
        assert!(catalog.resolve("dos").is_none());
        assert!(catalog.resolve("foo").is_none());
    }

    #[test]
    fn test_categories_report_availability() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("present.csv");
        std::fs::write(&present, "a\n1\n").unwrap();

        let catalog = DatasetCatalog::new()
            .with_entry("Present", &present)
            .with_entry("Absent", dir.path().join("absent.csv"));

        let categories = catalog.categories();
        assert_eq!(categories.len(), 2);
        assert!(categories.iter().any(|c| c.key == "Present" && c.available));
        assert!(categories.iter().any(|c| c.key == "Absent" && !c.available));
        assert_eq!(catalog.missing(), vec!["Absent"]);
    }
}
