//! Shared nested models
//!
//! Small value objects embedded across entity types.

use serde::{Deserialize, Serialize};

use crate::time;

/// A term from a controlled vocabulary (disorders, phenotypes, flags).
///
/// Queries against ontology-typed fields match any of the triplet members,
/// so a caller can filter by accession id or by human-readable name alike.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OntologyTerm {
    /// Accession id, e.g. `OMIM:613286`.
    pub id: String,
    /// Preferred name of the term.
    pub name: String,
    /// Vocabulary the term comes from, e.g. `OMIM`, `HPO`.
    pub source: String,
}

impl OntologyTerm {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        OntologyTerm {
            id: id.into(),
            name: name.into(),
            source: source.into(),
        }
    }
}

/// Free-text annotation attached to a record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Comment {
    /// User id of the author.
    pub author: String,
    /// Comment category, free-form.
    #[serde(rename = "type")]
    pub comment_type: String,
    pub text: String,
    /// Display timestamp.
    pub date: String,
}

impl Comment {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Comment {
            author: author.into(),
            comment_type: String::new(),
            text: text.into(),
            date: time::now_display(),
        }
    }
}

/// Operational alert raised on a record (e.g. a QC warning).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Alert {
    pub author: String,
    pub date: String,
    pub message: String,
    pub dismissed: bool,
}

/// Reference to an individual enrolled in a study.
///
/// Carries the identity fields only; the full individual record lives in
/// its own collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Individual {
    pub uid: i64,
    pub id: String,
    pub version: i32,
}

/// Reference to a family record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Family {
    pub uid: i64,
    pub id: String,
    pub version: i32,
    /// Members enrolled in the family, identity fields only.
    pub members: Vec<Individual>,
}

/// Reference to a catalog file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileRef {
    pub uid: i64,
    /// Path-like file id within the study.
    pub id: String,
    pub name: String,
}
