#![allow(dead_code)] // not every test binary uses every helper

//! Shared test harness
//!
//! Each test provisions its own database (`catalog_test_<uuid>`) on the
//! deployment named by `CATALOG_MONGODB_URI` (default: local MongoDB) and
//! drops it on cleanup, so tests run in parallel without interfering.
//! When no deployment is reachable the harness returns `None` and the
//! test skips itself.

use bson::{doc, Document};
use helix_catalog::db::mongodb::ClinicalAnalysisConverter;
use helix_catalog::CatalogMongoStore;
use helix_models::ClinicalAnalysis;

pub const STUDY_UID: i64 = 42;
pub const OTHER_STUDY_UID: i64 = 43;

pub struct TestCatalog {
    pub store: CatalogMongoStore,
}

impl TestCatalog {
    /// Drop the per-test database. Call at the end of every test.
    pub async fn cleanup(self) {
        let _ = self.store.drop_database().await;
    }
}

/// Connect to the test deployment, or `None` to skip the test.
pub async fn test_catalog() -> Option<TestCatalog> {
    let uri = std::env::var("CATALOG_MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let database = format!("catalog_test_{}", uuid::Uuid::new_v4().simple());
    let store = match CatalogMongoStore::connect(&uri, &database).await {
        Ok(store) => store,
        Err(_) => {
            eprintln!("skipping: cannot configure MongoDB client for {uri}");
            return None;
        }
    };
    if store.ping().await.is_err() {
        eprintln!("skipping: MongoDB not reachable at {uri}");
        return None;
    }
    store
        .ensure_indexes()
        .await
        .expect("create catalog indexes");
    Some(TestCatalog { store })
}

/// Study document with an owner, an admins group and a members group.
pub fn study_doc(uid: i64, id: &str, owner: &str) -> Document {
    doc! {
        "uid": uid,
        "id": id,
        "_ownerId": owner,
        "groups": [
            { "id": "@admins", "userIds": [owner] },
            { "id": "@members", "userIds": [] },
        ],
        "_acl": [],
    }
}

pub async fn seed_study(catalog: &TestCatalog, study: Document) {
    catalog
        .store
        .studies()
        .native_insert(study)
        .await
        .expect("seed study");
}

pub async fn seed_default_studies(catalog: &TestCatalog) {
    seed_study(catalog, study_doc(STUDY_UID, "rare-disease", "owner")).await;
    seed_study(catalog, study_doc(OTHER_STUDY_UID, "cancer-cohort", "owner")).await;
}

pub async fn seed_interpretation(catalog: &TestCatalog, uid: i64, id: &str) {
    catalog
        .store
        .interpretations()
        .native_insert(doc! { "uid": uid, "id": id, "clinicalAnalysisId": "" })
        .await
        .expect("seed interpretation");
}

pub fn new_analysis(id: &str) -> ClinicalAnalysis {
    ClinicalAnalysis {
        id: id.to_string(),
        description: format!("case {id}"),
        ..Default::default()
    }
}

/// Insert a pre-built analysis document, bypassing the adaptor's insert
/// pipeline. Used to seed entity-level ACLs.
pub async fn seed_analysis_with_acl(
    catalog: &TestCatalog,
    study_uid: i64,
    uid: i64,
    id: &str,
    acl: &[&str],
) {
    let mut analysis = new_analysis(id);
    analysis.uid = uid;
    analysis.study_uid = study_uid;
    analysis.creation_date = "20240101000000".to_string();
    let mut document = ClinicalAnalysisConverter
        .to_document(&analysis)
        .expect("serialize analysis");
    document.insert("_creationDate", bson::DateTime::now());
    document.insert(
        "_acl",
        acl.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
    );
    document.insert("_permissionRulesApplied", Vec::<String>::new());
    catalog
        .store
        .clinical()
        .native_insert(document)
        .await
        .expect("seed analysis");
}
