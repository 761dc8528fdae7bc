//! Clinical interpretation model

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::status::Status;

/// Result of analysing a clinical case: the conclusions a clinician (or an
/// automated pipeline) reached over the case's variants.
///
/// Interpretations are first-class records with their own collection and
/// uid; a clinical analysis holds references to them. Only the reference
/// fields are embedded when an interpretation is attached to an analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Interpretation {
    /// Internal unique id, assigned at creation.
    pub uid: i64,

    /// Human-readable id, unique within the parent clinical analysis.
    pub id: String,

    pub description: String,

    /// Id of the clinical analysis this interpretation belongs to.
    pub clinical_analysis_id: String,

    /// User id of the clinician who signed the interpretation.
    pub analyst_id: String,

    /// Display timestamp of creation.
    pub creation_date: String,

    pub version: i32,

    pub status: Status,

    /// Free-form extensions.
    pub attributes: HashMap<String, Value>,
}

impl Interpretation {
    /// A bare reference to an existing interpretation, enough to attach it
    /// to a clinical analysis.
    pub fn reference(uid: i64) -> Self {
        Interpretation {
            uid,
            ..Default::default()
        }
    }
}
