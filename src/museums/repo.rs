use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::users::repo_types::MuseumId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Museum {
    pub id: MuseumId,
    pub name: String,
    pub location: String,
    pub state: String,
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_price: Option<String>,
    #[serde(default)]
    pub top_exhibits: Vec<String>,
}

/// Read-only museum catalogue, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct MuseumDirectory {
    museums: Vec<Museum>,
}

impl MuseumDirectory {
    pub fn new(museums: Vec<Museum>) -> Self {
        Self { museums }
    }

    /// Missing file gives an empty directory; a malformed one is an error.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "museum catalogue not found; directory is empty");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("read museum catalogue {}", path.display()))
            }
        };
        let museums: Vec<Museum> = serde_json::from_slice(&raw)
            .with_context(|| format!("parse museum catalogue {}", path.display()))?;
        info!(count = museums.len(), "museum catalogue loaded");
        Ok(Self::new(museums))
    }

    pub fn get(&self, id: MuseumId) -> Option<&Museum> {
        self.museums.iter().find(|m| m.id == id)
    }

    /// Case-insensitive `term` match on name, location or description, and
    /// exact `state` match when one is given. The term is matched as typed.
    pub fn search(&self, term: Option<&str>, state: Option<&str>) -> Vec<&Museum> {
        let term = term.map(str::to_lowercase).unwrap_or_default();
        let state = state.filter(|s| !s.is_empty());
        self.museums
            .iter()
            .filter(|m| {
                term.is_empty()
                    || m.name.to_lowercase().contains(&term)
                    || m.location.to_lowercase().contains(&term)
                    || m.description.to_lowercase().contains(&term)
            })
            .filter(|m| state.map_or(true, |s| m.state == s))
            .collect()
    }

    pub fn states(&self) -> Vec<&str> {
        self.museums
            .iter()
            .map(|m| m.state.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn museum(id: MuseumId, name: &str, location: &str, state: &str, description: &str) -> Museum {
        Museum {
            id,
            name: name.into(),
            location: location.into(),
            state: state.into(),
            description: description.into(),
            image: String::new(),
            opening_hours: None,
            ticket_price: None,
            top_exhibits: vec![],
        }
    }

    fn directory() -> MuseumDirectory {
        MuseumDirectory::new(vec![
            museum(1, "National Museum", "New Delhi", "Delhi", "Harappan seals and bronzes"),
            museum(2, "Salar Jung Museum", "Hyderabad", "Telangana", "Veiled Rebecca"),
            museum(3, "Indian Museum", "Kolkata", "West Bengal", "Oldest museum in India"),
            museum(4, "Crafts Museum", "New Delhi", "Delhi", "Textiles and folk art"),
        ])
    }

    #[test]
    fn search_without_filters_returns_everything() {
        assert_eq!(directory().search(None, None).len(), 4);
        assert_eq!(directory().search(Some(""), Some("")).len(), 4);
    }

    #[test]
    fn search_term_is_not_trimmed() {
        let dir = directory();
        assert!(dir.search(Some(" hyderabad "), None).is_empty());
        assert_eq!(dir.search(Some("new delhi"), None).len(), 2);
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let dir = directory();
        let ids = |hits: Vec<&Museum>| hits.iter().map(|m| m.id).collect::<Vec<_>>();
        assert_eq!(ids(dir.search(Some("NEW DELHI"), None)), vec![1, 4]);
        assert_eq!(ids(dir.search(Some("rebecca"), None)), vec![2]);
        assert_eq!(ids(dir.search(Some("museum"), Some("Delhi"))), vec![1, 4]);
        assert!(dir.search(Some("louvre"), None).is_empty());
    }

    #[test]
    fn state_filter_is_exact() {
        let dir = directory();
        assert_eq!(dir.search(None, Some("delhi")).len(), 0);
        assert_eq!(dir.search(None, Some("Telangana"))[0].id, 2);
    }

    #[test]
    fn states_are_distinct_and_sorted() {
        assert_eq!(directory().states(), vec!["Delhi", "Telangana", "West Bengal"]);
    }

    #[tokio::test]
    async fn load_reads_catalogue_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let missing = MuseumDirectory::load(&dir.path().join("none.json")).await.unwrap();
        assert!(missing.search(None, None).is_empty());

        let path = dir.path().join("museums.json");
        std::fs::write(
            &path,
            r#"[{"id":7,"name":"Calico Museum","location":"Ahmedabad","state":"Gujarat",
                "description":"Textiles","image":"/calico.jpg","openingHours":"10:30-12:30",
                "topExhibits":["Pichhwai"]}]"#,
        )
        .unwrap();
        let loaded = MuseumDirectory::load(&path).await.unwrap();
        let calico = loaded.get(7).unwrap();
        assert_eq!(calico.opening_hours.as_deref(), Some("10:30-12:30"));
        assert_eq!(calico.top_exhibits, vec!["Pichhwai"]);
        assert!(loaded.get(8).is_none());
    }
}
