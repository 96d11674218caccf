//! Node metadata: timestamps plus an open-ended tag map.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ipld_core::ipld::Ipld;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    tags: BTreeMap<String, Ipld>,
}

impl Metadata {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            created: time,
            modified: time,
            tags: BTreeMap::new(),
        }
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    pub(crate) fn touch(&mut self, time: DateTime<Utc>) {
        self.modified = time;
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: Ipld) {
        self.tags.insert(key.into(), value);
    }

    pub fn tag(&self, key: &str) -> Option<&Ipld> {
        self.tags.get(key)
    }

    pub fn tags(&self) -> &BTreeMap<String, Ipld> {
        &self.tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_and_modified_start_equal() {
        let now = Utc::now();
        let meta = Metadata::new(now);

        assert_eq!(meta.created(), now);
        assert_eq!(meta.modified(), now);
    }

    #[test]
    fn test_touch_only_moves_modified() {
        let created = Utc::now();
        let mut meta = Metadata::new(created);
        let later = created + chrono::Duration::seconds(30);

        meta.touch(later);

        assert_eq!(meta.created(), created);
        assert_eq!(meta.modified(), later);
    }

    #[test]
    fn test_tags() {
        let mut meta = Metadata::new(Utc::now());
        assert!(meta.tag("mime").is_none());

        meta.set_tag("mime", Ipld::String("image/png".to_string()));
        assert_eq!(meta.tag("mime"), Some(&Ipld::String("image/png".to_string())));
        assert_eq!(meta.tags().len(), 1);
    }
}
