use crate::calculation::schema::Calculation;
use crate::error::TallyError;
use crate::model::Material;

/// A record stored as a sequence of versions under one unique id.
pub trait Versioned: Clone {
    fn unique_id(&self) -> &str;
    fn version(&self) -> u32;
    fn set_version(&mut self, version: u32);
    fn is_latest(&self) -> bool;
    fn set_latest(&mut self, latest: bool);
}

impl Versioned for Calculation {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }
    fn version(&self) -> u32 {
        self.version
    }
    fn set_version(&mut self, version: u32) {
        self.version = version;
    }
    fn is_latest(&self) -> bool {
        self.latest
    }
    fn set_latest(&mut self, latest: bool) {
        self.latest = latest;
    }
}

impl Versioned for Material {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }
    fn version(&self) -> u32 {
        self.version
    }
    fn set_version(&mut self, version: u32) {
        self.version = version;
    }
    fn is_latest(&self) -> bool {
        self.latest
    }
    fn set_latest(&mut self, latest: bool) {
        self.latest = latest;
    }
}

/// Append-only history of one unique id. The head is always the last entry.
#[derive(Debug, Clone)]
pub struct VersionChain<T> {
    versions: Vec<T>,
}

impl<T: Versioned> VersionChain<T> {
    pub fn new(mut first: T) -> Self {
        first.set_version(1);
        first.set_latest(true);
        Self {
            versions: vec![first],
        }
    }

    /// Rebuild a chain from stored rows.
    ///
    /// Rows must share one unique id, have distinct versions, and exactly one
    /// of them (the highest version) must be flagged latest.
    pub fn from_records(mut records: Vec<T>) -> Result<Self, TallyError> {
        let Some(first) = records.first() else {
            return Err(TallyError::Validation("empty version chain".into()));
        };
        let unique_id = first.unique_id().to_string();

        if records.iter().any(|r| r.unique_id() != unique_id) {
            return Err(TallyError::Validation(format!(
                "version chain '{unique_id}' mixes unique ids"
            )));
        }

        records.sort_by_key(|r| r.version());
        if records.windows(2).any(|w| w[0].version() == w[1].version()) {
            return Err(TallyError::Validation(format!(
                "'{unique_id}' has duplicate versions"
            )));
        }

        let latest: Vec<u32> = records
            .iter()
            .filter(|r| r.is_latest())
            .map(|r| r.version())
            .collect();
        let head_version = records.last().map(|r| r.version()).unwrap_or_default();
        match latest.as_slice() {
            [v] if *v == head_version => Ok(Self { versions: records }),
            [v] => Err(TallyError::Validation(format!(
                "'{unique_id}' marks version {v} latest but version {head_version} exists"
            ))),
            _ => Err(TallyError::Validation(format!(
                "'{unique_id}' must have exactly one latest version, found {}",
                latest.len()
            ))),
        }
    }

    pub fn head(&self) -> &T {
        // A chain is never empty: constructors always seed one version.
        &self.versions[self.versions.len() - 1]
    }

    /// Append `next` as the new head with the following version number.
    pub fn append(&mut self, mut next: T) -> &T {
        next.set_version(self.head().version() + 1);
        next.set_latest(true);
        self.versions.push(next);
        self.head()
    }

    pub fn versions(&self) -> &[T] {
        &self.versions
    }

    /// Every version with `latest` derived from the head position.
    pub fn records(&self) -> Vec<T> {
        let head = self.versions.len() - 1;
        self.versions
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mut v = v.clone();
                v.set_latest(i == head);
                v
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::Pointer;

    fn calc(version: u32, latest: bool) -> Calculation {
        Calculation {
            name: format!("v{version}"),
            unique_id: "calc".into(),
            version,
            latest,
            unit: "L".into(),
            expression: vec![Pointer::number("1")],
        }
    }

    #[test]
    fn test_append_moves_head() {
        let mut chain = VersionChain::new(calc(7, false));
        assert_eq!(chain.head().version, 1);
        assert!(chain.head().latest);

        let head = chain.append(calc(0, false));
        assert_eq!(head.version, 2);

        let records = chain.records();
        assert_eq!(records.len(), 2);
        assert!(!records[0].latest);
        assert!(records[1].latest);
    }

    #[test]
    fn test_from_records_sorts() {
        let chain = VersionChain::from_records(vec![calc(2, true), calc(1, false)]).unwrap();
        assert_eq!(chain.head().version, 2);
        assert_eq!(chain.versions()[0].version, 1);
    }

    #[test]
    fn test_from_records_requires_single_latest() {
        assert!(VersionChain::from_records(vec![calc(1, true), calc(2, true)]).is_err());
        assert!(VersionChain::from_records(vec![calc(1, false), calc(2, false)]).is_err());
    }

    #[test]
    fn test_from_records_latest_must_be_head() {
        assert!(VersionChain::from_records(vec![calc(1, true), calc(2, false)]).is_err());
    }

    #[test]
    fn test_from_records_rejects_duplicate_versions() {
        assert!(VersionChain::from_records(vec![calc(1, false), calc(1, true)]).is_err());
    }
}
