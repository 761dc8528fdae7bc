//! Clinical analysis model
//!
//! A clinical analysis is the unit of diagnostic work in a study: the case
//! under investigation, the people and files involved, and the
//! interpretations produced while working it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::common::{Alert, Comment, Family, FileRef, Individual, OntologyTerm};
use crate::interpretation::Interpretation;
use crate::status::Status;

/// A clinical case registered in a study.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClinicalAnalysis {
    /// Internal unique id, assigned by the catalog at insert time.
    pub uid: i64,

    /// Human-readable id, unique within the parent study.
    pub id: String,

    /// Globally unique id, assigned at insert time when absent.
    pub uuid: String,

    /// Owning study. An analysis belongs to exactly one study.
    pub study_uid: i64,

    pub description: String,

    #[serde(rename = "type")]
    pub analysis_type: ClinicalAnalysisType,

    /// Disorder under investigation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disorder: Option<OntologyTerm>,

    /// Input files (alignments, VCFs) the case is built on.
    pub files: Vec<FileRef>,

    /// Individual the case is centred on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proband: Option<Individual>,

    /// Family context, when the case is a family analysis.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<Family>,

    /// Family role of each member relative to the proband, keyed by
    /// individual id.
    pub role_to_proband: HashMap<String, String>,

    /// Interpretations produced for this case. Stored as references; the
    /// full records live in their own collection.
    pub interpretations: Vec<Interpretation>,

    pub priority: Priority,

    /// Assignment of the case to an analyst.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyst: Option<Analyst>,

    /// Free-form workflow flags (e.g. `LOW_COVERAGE`).
    pub flags: Vec<String>,

    pub consent: ClinicalConsent,

    pub comments: Vec<Comment>,

    pub alerts: Vec<Alert>,

    /// Display timestamp of creation.
    pub creation_date: String,

    /// Display timestamp of the last modification.
    pub modification_date: String,

    /// Display timestamp the case is due by.
    pub due_date: String,

    /// Release the analysis was created in.
    pub release: i32,

    pub status: Status,

    /// Free-form extensions.
    pub attributes: HashMap<String, Value>,
}

impl ClinicalAnalysis {
    /// Status names a clinical analysis can be in, soft-delete included.
    pub const STATUS_LIST: &'static [&'static str] = &[
        ClinicalStatus::PENDING,
        ClinicalStatus::IN_PROGRESS,
        Status::READY,
        ClinicalStatus::DONE,
        ClinicalStatus::CLOSED,
        ClinicalStatus::REJECTED,
        Status::DELETED,
    ];
}

/// Clinical workflow statuses, on top of the base [`Status`] names.
pub struct ClinicalStatus;

impl ClinicalStatus {
    pub const PENDING: &'static str = "PENDING";
    pub const IN_PROGRESS: &'static str = "IN_PROGRESS";
    pub const DONE: &'static str = "DONE";
    pub const CLOSED: &'static str = "CLOSED";
    pub const REJECTED: &'static str = "REJECTED";
}

/// Kind of clinical case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClinicalAnalysisType {
    #[default]
    Single,
    Family,
    Cancer,
    Cohort,
}

/// Triage priority of a case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Urgent,
    High,
    #[default]
    Medium,
    Low,
}

/// Assignment of a case to an analyst.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Analyst {
    /// User id of the assigned analyst.
    pub assignee: String,
    /// User id of whoever made the assignment.
    pub assigned_by: String,
    /// Display timestamp of the assignment.
    pub date: String,
}

/// Patient consent collected for the case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClinicalConsent {
    pub primary_findings: ConsentValue,
    pub secondary_findings: ConsentValue,
    pub carrier_findings: ConsentValue,
    pub research_information: ConsentValue,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsentValue {
    Yes,
    No,
    #[default]
    Unknown,
}
