//! Authorization-aware reads against a live database.
//!
//! The fixture study has an owner, an admin, a member with a study-level
//! grant, a member with per-document grants only, and a stranger. Three
//! analyses are seeded: one world-readable within the study, one granted
//! to carol only, one granted to nobody.

mod support;

use bson::doc;
use helix_catalog::{Error, Query, QueryOptions};
use support::{seed_analysis_with_acl, seed_study, test_catalog, TestCatalog, STUDY_UID};

async fn seed_acl_fixture(catalog: &TestCatalog) {
    seed_study(
        catalog,
        doc! {
            "uid": STUDY_UID,
            "id": "rare-disease",
            "_ownerId": "owner",
            "groups": [
                { "id": "@admins", "userIds": ["alice"] },
                { "id": "@members", "userIds": ["bob", "carol"] },
            ],
            "_acl": ["bob__VIEW_CLINICAL_ANALYSIS"],
        },
    )
    .await;

    seed_analysis_with_acl(catalog, STUDY_UID, 1001, "case-open", &["@members__VIEW"]).await;
    seed_analysis_with_acl(catalog, STUDY_UID, 1002, "case-carol", &["carol__VIEW"]).await;
    seed_analysis_with_acl(catalog, STUDY_UID, 1003, "case-private", &[]).await;
}

fn study_query() -> Query {
    Query::new().append("studyUid", STUDY_UID)
}

async fn visible_ids(catalog: &TestCatalog, user: &str) -> Vec<String> {
    let mut ids: Vec<String> = catalog
        .store
        .clinical()
        .get_for_user(&study_query(), &QueryOptions::new(), user)
        .await
        .expect("authorized get")
        .results
        .into_iter()
        .map(|a| a.id)
        .collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn blanket_visibility_for_owner_admin_and_study_grantee() {
    let Some(catalog) = test_catalog().await else { return };
    seed_acl_fixture(&catalog).await;

    for user in ["owner", "alice", "bob"] {
        let ids = visible_ids(&catalog, user).await;
        assert_eq!(
            ids,
            vec!["case-carol", "case-open", "case-private"],
            "user {user}"
        );
    }

    catalog.cleanup().await;
}

#[tokio::test]
async fn member_sees_only_granted_documents() {
    let Some(catalog) = test_catalog().await else { return };
    seed_acl_fixture(&catalog).await;

    let ids = visible_ids(&catalog, "carol").await;
    assert_eq!(ids, vec!["case-carol", "case-open"]);

    catalog.cleanup().await;
}

#[tokio::test]
async fn authorized_results_are_a_subset_of_unrestricted_results() {
    let Some(catalog) = test_catalog().await else { return };
    seed_acl_fixture(&catalog).await;
    let clinical = catalog.store.clinical();

    let unrestricted: Vec<String> = clinical
        .get(&study_query(), &QueryOptions::new())
        .await
        .expect("unrestricted get")
        .results
        .into_iter()
        .map(|a| a.id)
        .collect();

    for user in ["owner", "alice", "bob", "carol"] {
        let authorized = visible_ids(&catalog, user).await;
        assert!(
            authorized.iter().all(|id| unrestricted.contains(id)),
            "authorization must only narrow results (user {user})"
        );
    }

    catalog.cleanup().await;
}

#[tokio::test]
async fn count_and_get_share_the_same_authorization() {
    let Some(catalog) = test_catalog().await else { return };
    seed_acl_fixture(&catalog).await;
    let clinical = catalog.store.clinical();

    for user in ["owner", "carol", "bob"] {
        let results = clinical
            .get_for_user(&study_query(), &QueryOptions::new(), user)
            .await
            .expect("authorized get")
            .num_results();
        let counted = clinical
            .count_for_user(&study_query(), user, None)
            .await
            .expect("authorized count");
        assert_eq!(counted as usize, results, "user {user}");
    }

    catalog.cleanup().await;
}

#[tokio::test]
async fn authorized_page_total_uses_the_authorized_count() {
    let Some(catalog) = test_catalog().await else { return };
    seed_acl_fixture(&catalog).await;

    let page = catalog
        .store
        .clinical()
        .get_for_user(&study_query(), &QueryOptions::new().with_limit(1), "carol")
        .await
        .expect("authorized page");
    assert_eq!(page.num_results(), 1);
    assert_eq!(page.total, Some(2));

    catalog.cleanup().await;
}

#[tokio::test]
async fn stranger_is_denied_outright() {
    let Some(catalog) = test_catalog().await else { return };
    seed_acl_fixture(&catalog).await;

    let err = catalog
        .store
        .clinical()
        .get_for_user(&study_query(), &QueryOptions::new(), "mallory")
        .await
        .expect_err("no relationship to the study");
    assert!(matches!(err, Error::AuthorizationDenied { .. }), "got {err}");

    let err = catalog
        .store
        .clinical()
        .count_for_user(&study_query(), "mallory", None)
        .await
        .expect_err("count is guarded the same way");
    assert!(matches!(err, Error::AuthorizationDenied { .. }), "got {err}");

    catalog.cleanup().await;
}

#[tokio::test]
async fn invisible_documents_read_as_absent() {
    let Some(catalog) = test_catalog().await else { return };
    seed_acl_fixture(&catalog).await;

    // The document exists, but carol's read cannot tell.
    let hidden = catalog
        .store
        .clinical()
        .get_for_user(
            &study_query().append("id", "case-private"),
            &QueryOptions::new(),
            "carol",
        )
        .await
        .expect("filtered read");
    assert_eq!(hidden.num_results(), 0);

    catalog.cleanup().await;
}

#[tokio::test]
async fn group_by_applies_the_same_fragment() {
    let Some(catalog) = test_catalog().await else { return };
    seed_acl_fixture(&catalog).await;

    let groups = catalog
        .store
        .clinical()
        .group_by_for_user(&study_query(), &["status.name"], "carol")
        .await
        .expect("authorized group by");
    let total: i32 = groups
        .iter()
        .map(|g| g.get_i32("count").unwrap_or_default())
        .sum();
    assert_eq!(total, 2);

    catalog.cleanup().await;
}

#[tokio::test]
async fn authorized_iterator_streams_lazily() {
    let Some(catalog) = test_catalog().await else { return };
    seed_acl_fixture(&catalog).await;

    let mut cursor = catalog
        .store
        .clinical()
        .iterator_for_user(&study_query(), &QueryOptions::new(), "carol")
        .await
        .expect("authorized iterator");
    let mut seen = 0;
    while let Some(analysis) = cursor.try_next().await.expect("stream") {
        assert_ne!(analysis.id, "case-private");
        seen += 1;
    }
    assert_eq!(seen, 2);

    catalog.cleanup().await;
}
