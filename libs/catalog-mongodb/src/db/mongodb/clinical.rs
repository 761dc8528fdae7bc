//! Clinical-analysis entity adaptor
//!
//! Composes the registry, translator, authorization builder, update
//! builder and cursor into the public per-entity surface: count, get,
//! update, insert, iterate and group-by, each in an authorization-checked
//! and an unchecked (internal/administrative) variant.
//!
//! The checked variants derive a visibility fragment from the study
//! document fetched at call time and AND it into every filter they run —
//! get, count and group-by all share the same fragment, so authorized
//! counts can never disagree with authorized result sets.

use bson::{doc, Bson, Document};
use mongodb::options::FindOneOptions;
use mongodb::Cursor;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use helix_models::time;
use helix_models::{
    Alert, Analyst, ClinicalAnalysis, ClinicalConsent, Comment, Family, FileRef, Individual,
    Interpretation, OntologyTerm, Priority, Status,
};

use crate::db::mongodb::auth::build_auth_filter;
use crate::db::mongodb::collection::{find_options, CatalogCollection};
use crate::db::mongodb::interpretation::{InterpretationAdaptor, UidExists};
use crate::db::mongodb::iterator::{
    remove_inner_projections, CatalogCursor, DocumentConverter, NativeConverter,
};
use crate::db::mongodb::metadata::UidGenerator;
use crate::db::mongodb::query_utils::{
    add_auto_or_query, add_ontology_query_filter, and_filter, fix_complex_query_param,
    PERMISSION_RULES_APPLIED, PRIVATE_ACL, PRIVATE_CREATION_DATE, PRIVATE_MODIFICATION_DATE,
    PRIVATE_STUDY_UID, PRIVATE_UID,
};
use crate::db::mongodb::study::StudyAdaptor;
use crate::db::mongodb::update::{
    filter_map_params, filter_object_params, filter_string_list_params, filter_string_params,
    UpdateDocument,
};
use crate::error::{Error, Result};
use crate::params::{self, ParamType};
use crate::query::{value_to_string, Query, QueryOptions, UpdateAction};
use crate::result::{CatalogResult, WriteResult};

/// Study-level permission that grants visibility over every analysis.
pub const VIEW_CLINICAL_ANALYSIS_PERMISSION: &str = "VIEW_CLINICAL_ANALYSIS";
/// Entity-level permission checked per document.
pub const VIEW_PERMISSION: &str = "VIEW";

/// Queryable fields of a clinical analysis. Closed set: keys outside this
/// registry are rejected at translation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClinicalParam {
    Id,
    Uuid,
    Uid,
    StudyUid,
    AnalysisType,
    Description,
    Disorder,
    Flags,
    Priority,
    DueDate,
    CreationDate,
    ModificationDate,
    Release,
    Status,
    StatusName,
    StatusMsg,
    StatusDate,
    ProbandUid,
    FamilyUid,
    InterpretationsUid,
    Analyst,
    AnalystAssignee,
    Attributes,
    Nattributes,
    Battributes,
}

static PARAMS: phf::Map<&'static str, ClinicalParam> = phf::phf_map! {
    "id" => ClinicalParam::Id,
    "uuid" => ClinicalParam::Uuid,
    "uid" => ClinicalParam::Uid,
    "studyUid" => ClinicalParam::StudyUid,
    "type" => ClinicalParam::AnalysisType,
    "description" => ClinicalParam::Description,
    "disorder" => ClinicalParam::Disorder,
    "flags" => ClinicalParam::Flags,
    "priority" => ClinicalParam::Priority,
    "dueDate" => ClinicalParam::DueDate,
    "creationDate" => ClinicalParam::CreationDate,
    "modificationDate" => ClinicalParam::ModificationDate,
    "release" => ClinicalParam::Release,
    "status" => ClinicalParam::Status,
    "status.name" => ClinicalParam::StatusName,
    "status.msg" => ClinicalParam::StatusMsg,
    "status.date" => ClinicalParam::StatusDate,
    "proband.uid" => ClinicalParam::ProbandUid,
    "family.uid" => ClinicalParam::FamilyUid,
    "interpretations.uid" => ClinicalParam::InterpretationsUid,
    "analyst" => ClinicalParam::Analyst,
    "analyst.assignee" => ClinicalParam::AnalystAssignee,
    "attributes" => ClinicalParam::Attributes,
    "nattributes" => ClinicalParam::Nattributes,
    "battributes" => ClinicalParam::Battributes,
};

impl ClinicalParam {
    pub fn resolve(key: &str) -> Result<Self> {
        params::resolve(&PARAMS, key)
    }

    pub fn param_type(self) -> ParamType {
        match self {
            ClinicalParam::Uid
            | ClinicalParam::StudyUid
            | ClinicalParam::Release
            | ClinicalParam::ProbandUid
            | ClinicalParam::FamilyUid
            | ClinicalParam::InterpretationsUid => ParamType::Integer,
            ClinicalParam::DueDate
            | ClinicalParam::CreationDate
            | ClinicalParam::ModificationDate => ParamType::Date,
            ClinicalParam::Flags | ClinicalParam::Status => ParamType::TextArray,
            ClinicalParam::Nattributes => ParamType::Decimal,
            ClinicalParam::Battributes => ParamType::Boolean,
            _ => ParamType::Text,
        }
    }
}

/// Sparse update payload. Absent fields are left alone; list-valued fields
/// obey the per-field [`UpdateAction`] from the call's options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalAnalysisUpdateParams {
    /// New human-readable id. Renames are only accepted when the update
    /// targets exactly one record and the id is free within its study.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyst: Option<Analyst>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disorder: Option<OntologyTerm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proband: Option<Individual>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<Family>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Vec<Alert>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consent: Option<ClinicalConsent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_to_proband: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<HashMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpretations: Option<Vec<Interpretation>>,
}

/// Entity ↔ stored-document mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClinicalAnalysisConverter;

impl ClinicalAnalysisConverter {
    pub fn to_document(&self, analysis: &ClinicalAnalysis) -> Result<Document> {
        let mut document = bson::to_document(analysis)
            .map_err(|e| Error::Internal(format!("cannot serialize clinical analysis: {e}")))?;
        // Interpretations are first-class records; only references embed.
        if analysis
            .interpretations
            .iter()
            .any(|i| i.uid > 0)
        {
            let references: Vec<Bson> = analysis
                .interpretations
                .iter()
                .map(|i| doc! { "uid": i.uid }.into())
                .collect();
            document.insert("interpretations", references);
        }
        Ok(document)
    }
}

impl DocumentConverter for ClinicalAnalysisConverter {
    type Entity = ClinicalAnalysis;

    fn from_document(&self, mut document: Document) -> Result<ClinicalAnalysis> {
        document.remove("_id");
        document.remove(PRIVATE_CREATION_DATE);
        document.remove(PRIVATE_MODIFICATION_DATE);
        document.remove(PRIVATE_ACL);
        document.remove(PERMISSION_RULES_APPLIED);
        bson::from_document(document)
            .map_err(|e| Error::Internal(format!("malformed clinical analysis document: {e}")))
    }
}

/// Translate a generic query into a native filter.
///
/// Dispatches each entry on its registry type; date fields are redirected
/// to their indexed siblings, status names are normalized to their
/// positive form, and the legacy `analyst` key lands on
/// `analyst.assignee`. A supplied authorization fragment is ANDed in last;
/// an empty fragment means the caller is unrestricted, an absent query
/// yields the match-all filter.
pub fn parse_query(query: &Query, authorisation: Option<Document>) -> Result<Document> {
    let mut query = query.clone();
    fix_complex_query_param("attributes", &mut query)?;
    fix_complex_query_param("battributes", &mut query)?;
    fix_complex_query_param("nattributes", &mut query)?;

    let mut and_list = Vec::new();
    for (key, value) in query.iter() {
        let param = ClinicalParam::resolve(key)?;
        let param_type = param.param_type();
        match param {
            ClinicalParam::Uid => {
                add_auto_or_query(PRIVATE_UID, key, value, param_type, &mut and_list)?;
            }
            ClinicalParam::StudyUid => {
                add_auto_or_query(PRIVATE_STUDY_UID, key, value, param_type, &mut and_list)?;
            }
            ClinicalParam::Battributes | ClinicalParam::Nattributes => {
                // Both typed variants live under the shared attribute
                // namespace in storage.
                let mongo_key = match param {
                    ClinicalParam::Battributes => key.replacen("battributes", "attributes", 1),
                    _ => key.replacen("nattributes", "attributes", 1),
                };
                add_auto_or_query(&mongo_key, key, value, param_type, &mut and_list)?;
            }
            ClinicalParam::Disorder => {
                add_ontology_query_filter("disorder", key, value, &mut and_list)?;
            }
            ClinicalParam::CreationDate => {
                add_auto_or_query(PRIVATE_CREATION_DATE, key, value, param_type, &mut and_list)?;
            }
            ClinicalParam::ModificationDate => {
                add_auto_or_query(
                    PRIVATE_MODIFICATION_DATE,
                    key,
                    value,
                    param_type,
                    &mut and_list,
                )?;
            }
            ClinicalParam::StatusName => {
                // Stored statuses are always positive names; rewrite
                // negations against the clinical status list first.
                let positive = helix_models::positive_status(
                    ClinicalAnalysis::STATUS_LIST,
                    &value_to_string(value),
                );
                add_auto_or_query(
                    "status.name",
                    key,
                    &Value::String(positive),
                    param_type,
                    &mut and_list,
                )?;
            }
            ClinicalParam::Analyst | ClinicalParam::AnalystAssignee => {
                // Legacy `analyst` queries predate the nested assignee
                // field and keep working against it.
                add_auto_or_query("analyst.assignee", key, value, param_type, &mut and_list)?;
            }
            _ => {
                add_auto_or_query(key, key, value, param_type, &mut and_list)?;
            }
        }
    }

    if let Some(authorisation) = authorisation {
        if !authorisation.is_empty() {
            and_list.push(authorisation);
        }
    }
    Ok(and_filter(and_list))
}

/// Inject the soft-delete exclusion unless the caller constrained the
/// status name explicitly.
fn filter_out_deleted(query: &mut Query) {
    if !query.contains_key("status.name") {
        query.put("status.name", format!("!={}", Status::DELETED));
    }
}

#[derive(Debug, Clone)]
pub struct ClinicalAnalysisAdaptor {
    collection: CatalogCollection,
    studies: StudyAdaptor,
    interpretations: InterpretationAdaptor,
    uid_generator: UidGenerator,
    converter: ClinicalAnalysisConverter,
}

impl ClinicalAnalysisAdaptor {
    pub fn new(
        collection: CatalogCollection,
        studies: StudyAdaptor,
        interpretations: InterpretationAdaptor,
        uid_generator: UidGenerator,
    ) -> Self {
        ClinicalAnalysisAdaptor {
            collection,
            studies,
            interpretations,
            uid_generator,
            converter: ClinicalAnalysisConverter,
        }
    }

    /// Uniqueness constraints backing the advisory pre-checks. The
    /// `(studyUid, id)` index is the authoritative guard against duplicate
    /// ids racing past the pre-check.
    pub async fn ensure_indexes(&self) -> Result<()> {
        self.collection
            .create_unique_index(doc! { PRIVATE_STUDY_UID: 1, "id": 1 })
            .await?;
        self.collection
            .create_unique_index(doc! { PRIVATE_UID: 1 })
            .await
    }

    // ── counts ──────────────────────────────────────────────────────

    /// Unrestricted count; internal use.
    pub async fn count(&self, query: &Query) -> Result<u64> {
        let filter = parse_query(query, None)?;
        self.collection.count(filter).await
    }

    /// Count of the documents `user` may see. Uses the same authorization
    /// fragment as the matching get, so the two never diverge.
    pub async fn count_for_user(
        &self,
        query: &Query,
        user: &str,
        study_permission: Option<&str>,
    ) -> Result<u64> {
        let mut query = query.clone();
        filter_out_deleted(&mut query);
        let authorisation = self.auth_fragment(&query, user, study_permission).await?;
        let filter = parse_query(&query, Some(authorisation))?;
        self.collection.count(filter).await
    }

    // ── iterators ───────────────────────────────────────────────────

    pub async fn iterator(
        &self,
        query: &Query,
        options: &QueryOptions,
    ) -> Result<CatalogCursor<ClinicalAnalysisConverter>> {
        let cursor = self.mongo_cursor(query, options, None).await?;
        Ok(CatalogCursor::new(cursor, self.converter))
    }

    pub async fn iterator_for_user(
        &self,
        query: &Query,
        options: &QueryOptions,
        user: &str,
    ) -> Result<CatalogCursor<ClinicalAnalysisConverter>> {
        let authorisation = self.auth_fragment(query, user, None).await?;
        let cursor = self.mongo_cursor(query, options, Some(authorisation)).await?;
        Ok(CatalogCursor::new(cursor, self.converter))
    }

    pub async fn native_iterator(
        &self,
        query: &Query,
        options: &QueryOptions,
    ) -> Result<CatalogCursor<NativeConverter>> {
        let cursor = self.mongo_cursor(query, options, None).await?;
        Ok(CatalogCursor::new(cursor, NativeConverter))
    }

    pub async fn native_iterator_for_user(
        &self,
        query: &Query,
        options: &QueryOptions,
        user: &str,
    ) -> Result<CatalogCursor<NativeConverter>> {
        let authorisation = self.auth_fragment(query, user, None).await?;
        let cursor = self.mongo_cursor(query, options, Some(authorisation)).await?;
        Ok(CatalogCursor::new(cursor, NativeConverter))
    }

    // ── reads ───────────────────────────────────────────────────────

    pub async fn get(
        &self,
        query: &Query,
        options: &QueryOptions,
    ) -> Result<CatalogResult<ClinicalAnalysis>> {
        let results = self.iterator(query, options).await?.collect_results().await?;
        let total = self.total_if_truncated(query, options, results.len(), None).await?;
        Ok(CatalogResult { results, total })
    }

    /// Authorized read: documents the principal cannot see are simply not
    /// part of the result, indistinguishable from absent ones.
    pub async fn get_for_user(
        &self,
        query: &Query,
        options: &QueryOptions,
        user: &str,
    ) -> Result<CatalogResult<ClinicalAnalysis>> {
        let results = self
            .iterator_for_user(query, options, user)
            .await?
            .collect_results()
            .await?;
        let total = self
            .total_if_truncated(query, options, results.len(), Some(user))
            .await?;
        Ok(CatalogResult { results, total })
    }

    pub async fn native_get(
        &self,
        query: &Query,
        options: &QueryOptions,
    ) -> Result<CatalogResult<Document>> {
        let results = self
            .native_iterator(query, options)
            .await?
            .collect_results()
            .await?;
        let total = self.total_if_truncated(query, options, results.len(), None).await?;
        Ok(CatalogResult { results, total })
    }

    pub async fn native_get_for_user(
        &self,
        query: &Query,
        options: &QueryOptions,
        user: &str,
    ) -> Result<CatalogResult<Document>> {
        let results = self
            .native_iterator_for_user(query, options, user)
            .await?
            .collect_results()
            .await?;
        let total = self
            .total_if_truncated(query, options, results.len(), Some(user))
            .await?;
        Ok(CatalogResult { results, total })
    }

    /// Point read by internal uid. Soft-deleted records do not resolve.
    pub async fn get_by_uid(
        &self,
        uid: i64,
        options: &QueryOptions,
    ) -> Result<ClinicalAnalysis> {
        check_uid(uid)?;
        let study_uid = self.get_study_uid(uid).await?;
        let query = Query::new()
            .append(PRIVATE_UID, uid)
            .append("status.name", format!("!={}", Status::DELETED))
            .append(PRIVATE_STUDY_UID, study_uid);
        self.get(&query, options)
            .await?
            .into_first()
            .ok_or_else(|| Error::not_found("ClinicalAnalysis", uid))
    }

    /// Point read by human-readable id within a study.
    pub async fn get_by_id(
        &self,
        study_uid: i64,
        id: &str,
        options: &QueryOptions,
    ) -> Result<ClinicalAnalysis> {
        let query = Query::new()
            .append("id", id)
            .append("status.name", format!("!={}", Status::DELETED))
            .append(PRIVATE_STUDY_UID, study_uid);
        self.get(&query, options)
            .await?
            .into_first()
            .ok_or_else(|| Error::not_found("ClinicalAnalysis", id))
    }

    /// Owning study of an analysis, via a projected point read.
    pub async fn get_study_uid(&self, uid: i64) -> Result<i64> {
        let projection = FindOneOptions::builder()
            .projection(doc! { PRIVATE_STUDY_UID: 1 })
            .build();
        let document = self
            .collection
            .find_one(doc! { PRIVATE_UID: uid }, Some(projection))
            .await?
            .ok_or_else(|| Error::not_found("ClinicalAnalysis", uid))?;
        bson_i64(&document, PRIVATE_STUDY_UID)
            .ok_or_else(|| Error::Internal(format!("analysis {uid} has no owning study")))
    }

    /// Apply `action` to every entity matching the query.
    pub async fn for_each<F>(
        &self,
        query: &Query,
        options: &QueryOptions,
        mut action: F,
    ) -> Result<()>
    where
        F: FnMut(ClinicalAnalysis),
    {
        let mut cursor = self.iterator(query, options).await?;
        while let Some(entity) = cursor.try_next().await? {
            action(entity);
        }
        Ok(())
    }

    // ── group by ────────────────────────────────────────────────────

    pub async fn group_by(&self, query: &Query, fields: &[&str]) -> Result<Vec<Document>> {
        let mut query = query.clone();
        filter_out_deleted(&mut query);
        let filter = parse_query(&query, None)?;
        self.run_group_by(filter, fields).await
    }

    pub async fn group_by_for_user(
        &self,
        query: &Query,
        fields: &[&str],
        user: &str,
    ) -> Result<Vec<Document>> {
        let mut query = query.clone();
        filter_out_deleted(&mut query);
        let authorisation = self.auth_fragment(&query, user, None).await?;
        let filter = parse_query(&query, Some(authorisation))?;
        self.run_group_by(filter, fields).await
    }

    async fn run_group_by(&self, filter: Document, fields: &[&str]) -> Result<Vec<Document>> {
        let mut group_id = Document::new();
        for field in fields {
            // Dots are not legal in group keys.
            group_id.insert(field.replace('.', "_"), format!("${field}"));
        }
        let pipeline = vec![
            doc! { "$match": filter },
            doc! { "$group": {
                "_id": group_id,
                "count": { "$sum": 1 },
                "items": { "$addToSet": "$id" },
            } },
        ];
        let cursor = self.collection.aggregate(pipeline).await?;
        CatalogCursor::new(cursor, NativeConverter).collect_results().await
    }

    // ── writes ──────────────────────────────────────────────────────

    /// Insert a new analysis into a study.
    ///
    /// The duplicate-id pre-check is advisory; the unique index has the
    /// final word, and its rejection surfaces as the same conflict.
    pub async fn insert(
        &self,
        study_uid: i64,
        mut analysis: ClinicalAnalysis,
    ) -> Result<ClinicalAnalysis> {
        self.studies.check_uid(study_uid).await?;
        if analysis.id.is_empty() {
            return Err(Error::Validation("clinical analysis id is required".into()));
        }
        let duplicates = self
            .collection
            .count(doc! { "id": &analysis.id, PRIVATE_STUDY_UID: study_uid })
            .await?;
        if duplicates > 0 {
            return Err(duplicate_id_conflict(&analysis.id, study_uid));
        }

        analysis.uid = self.uid_generator.next_uid().await?;
        analysis.study_uid = study_uid;
        if analysis.uuid.is_empty() {
            analysis.uuid = uuid::Uuid::new_v4().to_string();
        }
        let creation_instant = if analysis.creation_date.is_empty() {
            let now = time::now();
            analysis.creation_date = time::to_display(now);
            now
        } else {
            time::parse_display(&analysis.creation_date).ok_or_else(|| {
                Error::Validation(format!(
                    "invalid creationDate '{}'",
                    analysis.creation_date
                ))
            })?
        };

        let mut document = self.converter.to_document(&analysis)?;
        document.insert(PRIVATE_CREATION_DATE, bson::DateTime::from_chrono(creation_instant));
        document.insert(PERMISSION_RULES_APPLIED, Bson::Array(Vec::new()));
        document.insert(PRIVATE_ACL, Bson::Array(Vec::new()));

        match self.collection.insert_one(document).await {
            Ok(()) => Ok(analysis),
            Err(Error::Store(store_err)) if Error::is_duplicate_key(&store_err) => {
                Err(duplicate_id_conflict(&analysis.id, study_uid))
            }
            Err(err) => Err(err),
        }
    }

    /// Low-level insert of a raw document (administrative use).
    pub async fn native_insert(&self, document: Document) -> Result<()> {
        self.collection.insert_one(document).await
    }

    /// Physical removal is not part of this engine; deletion happens by
    /// updating the status to `DELETED`, which default reads exclude.
    pub async fn delete(&self, _uid: i64) -> Result<WriteResult> {
        Err(Error::NotImplemented(
            "clinical analysis delete; set the DELETED status instead".into(),
        ))
    }

    /// Partially update one analysis by uid.
    ///
    /// A computed no-op returns without touching the store (and without
    /// stamping the modification date). A non-empty update matching no
    /// document is a `NotFound`.
    pub async fn update(
        &self,
        uid: i64,
        params: &ClinicalAnalysisUpdateParams,
        options: &QueryOptions,
    ) -> Result<WriteResult> {
        check_uid(uid)?;
        let query = Query::new().append(PRIVATE_UID, uid);
        let update = self
            .parse_and_validate_update_params(params, &query, options)
            .await?;
        if update.is_empty() {
            return Ok(WriteResult::default());
        }

        let operation = update.to_final_update_document();
        let result = self
            .collection
            .update_one(doc! { PRIVATE_UID: uid }, operation)
            .await?;
        if result.matched == 0 {
            return Err(Error::not_found("ClinicalAnalysis", uid));
        }
        Ok(result)
    }

    /// Classify and validate a sparse payload into an update document.
    /// Validation failures leave the store untouched.
    async fn parse_and_validate_update_params(
        &self,
        params: &ClinicalAnalysisUpdateParams,
        query: &Query,
        options: &QueryOptions,
    ) -> Result<UpdateDocument> {
        let mut document = UpdateDocument::new();
        let params_doc = bson::to_document(params)
            .map_err(|e| Error::Validation(format!("invalid update payload: {e}")))?;

        if let Some(new_id) = &params.id {
            // Renames only make sense against a single record.
            let mut current = self.get(query, &QueryOptions::new()).await?;
            let target = match current.results.len() {
                0 => {
                    return Err(Error::not_found(
                        "ClinicalAnalysis",
                        "no analysis matched the update target",
                    ));
                }
                1 => current.results.remove(0),
                _ => {
                    return Err(Error::Conflict(
                        "cannot set the same id for different clinical analyses".into(),
                    ));
                }
            };
            let study_uid = self.get_study_uid(target.uid).await?;
            let duplicates = self
                .count(
                    &Query::new()
                        .append("id", new_id.as_str())
                        .append(PRIVATE_STUDY_UID, study_uid),
                )
                .await?;
            if duplicates > 0 {
                return Err(duplicate_id_conflict(new_id, study_uid));
            }
            document.set.insert("id", new_id.as_str());
        }

        filter_string_params(
            &params_doc,
            &mut document.set,
            &["description", "priority", "dueDate"],
        );
        filter_string_list_params(&params_doc, &mut document.set, &["flags"]);
        filter_object_params(
            &params_doc,
            &mut document.set,
            &[
                "disorder", "files", "proband", "family", "status", "analyst", "consent",
                "comments", "alerts",
            ],
        );
        filter_map_params(&params_doc, &mut document.set, &["roleToProband", "attributes"]);

        validate_linked_reference(&mut document.set, "family", "Family")?;
        validate_linked_reference(&mut document.set, "proband", "Individual")?;

        if let Some(interpretations) = &params.interpretations {
            if !interpretations.is_empty() {
                for interpretation in interpretations {
                    if !self.interpretations.exists(interpretation.uid).await? {
                        return Err(Error::DanglingReference {
                            entity: "Interpretation",
                            uid: interpretation.uid,
                        });
                    }
                }
                let references: Vec<Bson> = interpretations
                    .iter()
                    .map(|i| doc! { "uid": i.uid }.into())
                    .collect();
                match options.action_for("interpretations") {
                    UpdateAction::Set => {
                        document.set.insert("interpretations", references);
                    }
                    UpdateAction::Remove => {
                        document.pull_all.insert("interpretations", references);
                    }
                    UpdateAction::Add => {
                        document.add_to_set.insert("interpretations", references);
                    }
                }
            }
        }

        if !document.is_empty() {
            let now = time::now();
            document.set.insert("modificationDate", time::to_display(now));
            document
                .set
                .insert(PRIVATE_MODIFICATION_DATE, bson::DateTime::from_chrono(now));
        }

        Ok(document)
    }

    // ── internals ───────────────────────────────────────────────────

    async fn mongo_cursor(
        &self,
        query: &Query,
        options: &QueryOptions,
        authorisation: Option<Document>,
    ) -> Result<Cursor<Document>> {
        let mut query = query.clone();
        filter_out_deleted(&mut query);
        let filter = parse_query(&query, authorisation)?;
        let options = remove_inner_projections(options, "interpretations");
        self.collection.find(filter, find_options(&options)).await
    }

    /// Fetch the study permission snapshot referenced by the query and
    /// derive the caller's visibility fragment from it.
    async fn auth_fragment(
        &self,
        query: &Query,
        user: &str,
        study_permission: Option<&str>,
    ) -> Result<Document> {
        let study_uid = query.get_i64(PRIVATE_STUDY_UID).ok_or_else(|| {
            Error::Validation("authorized reads require a studyUid filter".into())
        })?;
        let study = self.studies.native_get(study_uid).await?;
        build_auth_filter(
            &study,
            user,
            study_permission.unwrap_or(VIEW_CLINICAL_ANALYSIS_PERMISSION),
            VIEW_PERMISSION,
        )
    }

    /// Run the separate count only when the page filled the limit — the
    /// page itself is authoritative otherwise.
    async fn total_if_truncated(
        &self,
        query: &Query,
        options: &QueryOptions,
        num_results: usize,
        user: Option<&str>,
    ) -> Result<Option<u64>> {
        if options.skip_count {
            return Ok(None);
        }
        let Some(limit) = options.limit else {
            return Ok(None);
        };
        if limit <= 0 || num_results as i64 != limit {
            return Ok(None);
        }
        let total = match user {
            Some(user) => self.count_for_user(query, user, None).await?,
            None => {
                let mut query = query.clone();
                filter_out_deleted(&mut query);
                self.count(&query).await?
            }
        };
        Ok(Some(total))
    }
}

fn check_uid(uid: i64) -> Result<()> {
    if uid <= 0 {
        return Err(Error::Validation(format!(
            "clinical analysis uid '{uid}' is not valid"
        )));
    }
    Ok(())
}

fn duplicate_id_conflict(id: &str, study_uid: i64) -> Error {
    Error::Conflict(format!(
        "a clinical analysis with id '{id}' already exists in study {study_uid}"
    ))
}

/// Reduce a linked-record object to its reference form and refuse
/// references that cannot point at an existing record.
fn validate_linked_reference(set: &mut Document, field: &str, entity: &'static str) -> Result<()> {
    let Some(Bson::Document(reference)) = set.get(field) else {
        return Ok(());
    };
    let uid = bson_i64(reference, "uid").unwrap_or_default();
    if uid <= 0 {
        return Err(Error::DanglingReference { entity, uid });
    }
    let mut reduced = doc! { "uid": uid };
    if let Some(version) = reference.get("version") {
        reduced.insert("version", version.clone());
    }
    set.insert(field, reduced);
    Ok(())
}

fn bson_i64(document: &Document, key: &str) -> Option<i64> {
    match document.get(key) {
        Some(Bson::Int64(value)) => Some(*value),
        Some(Bson::Int32(value)) => Some(i64::from(*value)),
        _ => None,
    }
}
