//! Insert/update lifecycle against a live catalog database.

mod support;

use helix_catalog::db::mongodb::ClinicalAnalysisUpdateParams;
use helix_catalog::{Error, Query, QueryOptions, UpdateAction};
use helix_models::{Interpretation, Status};
use support::{
    new_analysis, seed_default_studies, seed_interpretation, test_catalog, OTHER_STUDY_UID,
    STUDY_UID,
};

#[tokio::test]
async fn insert_assigns_identity_and_round_trips() {
    let Some(catalog) = test_catalog().await else { return };
    seed_default_studies(&catalog).await;
    let clinical = catalog.store.clinical();

    let inserted = clinical
        .insert(STUDY_UID, new_analysis("case-1"))
        .await
        .expect("insert");
    assert!(inserted.uid > 0);
    assert!(!inserted.uuid.is_empty());
    assert!(!inserted.creation_date.is_empty());
    assert_eq!(inserted.study_uid, STUDY_UID);

    let by_uid = clinical
        .get_by_uid(inserted.uid, &QueryOptions::new())
        .await
        .expect("get by uid");
    assert_eq!(by_uid.id, "case-1");
    assert_eq!(by_uid.status.name, Status::READY);

    let by_id = clinical
        .get_by_id(STUDY_UID, "case-1", &QueryOptions::new())
        .await
        .expect("get by id");
    assert_eq!(by_id.uid, inserted.uid);

    catalog.cleanup().await;
}

#[tokio::test]
async fn uids_increase_monotonically() {
    let Some(catalog) = test_catalog().await else { return };
    seed_default_studies(&catalog).await;
    let clinical = catalog.store.clinical();

    let first = clinical.insert(STUDY_UID, new_analysis("case-1")).await.unwrap();
    let second = clinical.insert(STUDY_UID, new_analysis("case-2")).await.unwrap();
    assert!(second.uid > first.uid);

    catalog.cleanup().await;
}

#[tokio::test]
async fn duplicate_id_conflicts_within_a_study_only() {
    let Some(catalog) = test_catalog().await else { return };
    seed_default_studies(&catalog).await;
    let clinical = catalog.store.clinical();

    clinical
        .insert(STUDY_UID, new_analysis("case-1"))
        .await
        .expect("first insert");

    let err = clinical
        .insert(STUDY_UID, new_analysis("case-1"))
        .await
        .expect_err("same id in same study");
    assert!(matches!(err, Error::Conflict(_)), "got {err}");

    // The same id in another study is fine.
    clinical
        .insert(OTHER_STUDY_UID, new_analysis("case-1"))
        .await
        .expect("same id in other study");

    catalog.cleanup().await;
}

#[tokio::test]
async fn insert_into_missing_study_is_not_found() {
    let Some(catalog) = test_catalog().await else { return };
    let err = catalog
        .store
        .clinical()
        .insert(999, new_analysis("case-1"))
        .await
        .expect_err("study does not exist");
    assert!(matches!(err, Error::NotFound { .. }), "got {err}");
    catalog.cleanup().await;
}

#[tokio::test]
async fn scalar_update_stamps_modification_date() {
    let Some(catalog) = test_catalog().await else { return };
    seed_default_studies(&catalog).await;
    let clinical = catalog.store.clinical();
    let inserted = clinical.insert(STUDY_UID, new_analysis("case-1")).await.unwrap();

    let result = clinical
        .update(
            inserted.uid,
            &ClinicalAnalysisUpdateParams {
                description: Some("re-reviewed".into()),
                ..Default::default()
            },
            &QueryOptions::new(),
        )
        .await
        .expect("update");
    assert_eq!(result.matched, 1);

    let updated = clinical.get_by_uid(inserted.uid, &QueryOptions::new()).await.unwrap();
    assert_eq!(updated.description, "re-reviewed");
    assert!(!updated.modification_date.is_empty());

    catalog.cleanup().await;
}

#[tokio::test]
async fn empty_update_is_a_noop() {
    let Some(catalog) = test_catalog().await else { return };
    seed_default_studies(&catalog).await;
    let clinical = catalog.store.clinical();
    let inserted = clinical.insert(STUDY_UID, new_analysis("case-1")).await.unwrap();
    let before = clinical.get_by_uid(inserted.uid, &QueryOptions::new()).await.unwrap();

    let result = clinical
        .update(
            inserted.uid,
            &ClinicalAnalysisUpdateParams::default(),
            &QueryOptions::new(),
        )
        .await
        .expect("noop update");
    assert_eq!(result.matched, 0);

    let after = clinical.get_by_uid(inserted.uid, &QueryOptions::new()).await.unwrap();
    assert_eq!(after.modification_date, before.modification_date);

    catalog.cleanup().await;
}

#[tokio::test]
async fn updating_missing_analysis_is_not_found() {
    let Some(catalog) = test_catalog().await else { return };
    seed_default_studies(&catalog).await;

    let err = catalog
        .store
        .clinical()
        .update(
            12345,
            &ClinicalAnalysisUpdateParams {
                description: Some("ghost".into()),
                ..Default::default()
            },
            &QueryOptions::new(),
        )
        .await
        .expect_err("nothing to update");
    assert!(matches!(err, Error::NotFound { .. }), "got {err}");

    catalog.cleanup().await;
}

#[tokio::test]
async fn rename_to_taken_id_conflicts_and_modifies_nothing() {
    let Some(catalog) = test_catalog().await else { return };
    seed_default_studies(&catalog).await;
    let clinical = catalog.store.clinical();

    let first = clinical.insert(STUDY_UID, new_analysis("case-a")).await.unwrap();
    let second = clinical.insert(STUDY_UID, new_analysis("case-b")).await.unwrap();

    let err = clinical
        .update(
            second.uid,
            &ClinicalAnalysisUpdateParams {
                id: Some("case-a".into()),
                ..Default::default()
            },
            &QueryOptions::new(),
        )
        .await
        .expect_err("rename onto an existing id");
    assert!(matches!(err, Error::Conflict(_)), "got {err}");

    let first_after = clinical.get_by_uid(first.uid, &QueryOptions::new()).await.unwrap();
    let second_after = clinical.get_by_uid(second.uid, &QueryOptions::new()).await.unwrap();
    assert_eq!(first_after.id, "case-a");
    assert_eq!(second_after.id, "case-b");
    assert_eq!(second_after.modification_date, second.modification_date);

    catalog.cleanup().await;
}

#[tokio::test]
async fn rename_to_free_id_succeeds() {
    let Some(catalog) = test_catalog().await else { return };
    seed_default_studies(&catalog).await;
    let clinical = catalog.store.clinical();
    let inserted = clinical.insert(STUDY_UID, new_analysis("case-a")).await.unwrap();

    clinical
        .update(
            inserted.uid,
            &ClinicalAnalysisUpdateParams {
                id: Some("case-renamed".into()),
                ..Default::default()
            },
            &QueryOptions::new(),
        )
        .await
        .expect("rename");

    let renamed = clinical.get_by_uid(inserted.uid, &QueryOptions::new()).await.unwrap();
    assert_eq!(renamed.id, "case-renamed");

    catalog.cleanup().await;
}

#[tokio::test]
async fn add_interpretations_deduplicates() {
    let Some(catalog) = test_catalog().await else { return };
    seed_default_studies(&catalog).await;
    seed_interpretation(&catalog, 501, "int-1").await;
    let clinical = catalog.store.clinical();
    let inserted = clinical.insert(STUDY_UID, new_analysis("case-1")).await.unwrap();

    let params = ClinicalAnalysisUpdateParams {
        interpretations: Some(vec![Interpretation::reference(501)]),
        ..Default::default()
    };
    // Default action is ADD; applying the same element twice keeps one.
    clinical
        .update(inserted.uid, &params, &QueryOptions::new())
        .await
        .expect("first add");
    clinical
        .update(inserted.uid, &params, &QueryOptions::new())
        .await
        .expect("second add");

    let updated = clinical.get_by_uid(inserted.uid, &QueryOptions::new()).await.unwrap();
    assert_eq!(updated.interpretations.len(), 1);
    assert_eq!(updated.interpretations[0].uid, 501);

    catalog.cleanup().await;
}

#[tokio::test]
async fn remove_action_pulls_interpretations() {
    let Some(catalog) = test_catalog().await else { return };
    seed_default_studies(&catalog).await;
    seed_interpretation(&catalog, 501, "int-1").await;
    seed_interpretation(&catalog, 502, "int-2").await;
    let clinical = catalog.store.clinical();
    let inserted = clinical.insert(STUDY_UID, new_analysis("case-1")).await.unwrap();

    clinical
        .update(
            inserted.uid,
            &ClinicalAnalysisUpdateParams {
                interpretations: Some(vec![
                    Interpretation::reference(501),
                    Interpretation::reference(502),
                ]),
                ..Default::default()
            },
            &QueryOptions::new(),
        )
        .await
        .expect("attach both");

    clinical
        .update(
            inserted.uid,
            &ClinicalAnalysisUpdateParams {
                interpretations: Some(vec![Interpretation::reference(501)]),
                ..Default::default()
            },
            &QueryOptions::new().with_action("interpretations", UpdateAction::Remove),
        )
        .await
        .expect("remove one");

    let updated = clinical.get_by_uid(inserted.uid, &QueryOptions::new()).await.unwrap();
    assert_eq!(updated.interpretations.len(), 1);
    assert_eq!(updated.interpretations[0].uid, 502);

    catalog.cleanup().await;
}

#[tokio::test]
async fn set_action_replaces_interpretations() {
    let Some(catalog) = test_catalog().await else { return };
    seed_default_studies(&catalog).await;
    seed_interpretation(&catalog, 501, "int-1").await;
    seed_interpretation(&catalog, 502, "int-2").await;
    let clinical = catalog.store.clinical();
    let inserted = clinical.insert(STUDY_UID, new_analysis("case-1")).await.unwrap();

    clinical
        .update(
            inserted.uid,
            &ClinicalAnalysisUpdateParams {
                interpretations: Some(vec![Interpretation::reference(501)]),
                ..Default::default()
            },
            &QueryOptions::new(),
        )
        .await
        .expect("attach");

    clinical
        .update(
            inserted.uid,
            &ClinicalAnalysisUpdateParams {
                interpretations: Some(vec![Interpretation::reference(502)]),
                ..Default::default()
            },
            &QueryOptions::new().with_action("interpretations", UpdateAction::Set),
        )
        .await
        .expect("replace");

    let updated = clinical.get_by_uid(inserted.uid, &QueryOptions::new()).await.unwrap();
    assert_eq!(updated.interpretations.len(), 1);
    assert_eq!(updated.interpretations[0].uid, 502);

    catalog.cleanup().await;
}

#[tokio::test]
async fn dangling_interpretation_reference_is_rejected() {
    let Some(catalog) = test_catalog().await else { return };
    seed_default_studies(&catalog).await;
    let clinical = catalog.store.clinical();
    let inserted = clinical.insert(STUDY_UID, new_analysis("case-1")).await.unwrap();

    let err = clinical
        .update(
            inserted.uid,
            &ClinicalAnalysisUpdateParams {
                interpretations: Some(vec![Interpretation::reference(9999)]),
                ..Default::default()
            },
            &QueryOptions::new(),
        )
        .await
        .expect_err("reference does not exist");
    assert!(
        matches!(err, Error::DanglingReference { uid: 9999, .. }),
        "got {err}"
    );

    // Validation failed before any write.
    let after = clinical.get_by_uid(inserted.uid, &QueryOptions::new()).await.unwrap();
    assert!(after.interpretations.is_empty());
    assert_eq!(after.modification_date, inserted.modification_date);

    catalog.cleanup().await;
}

#[tokio::test]
async fn soft_delete_via_status_update() {
    let Some(catalog) = test_catalog().await else { return };
    seed_default_studies(&catalog).await;
    let clinical = catalog.store.clinical();
    let inserted = clinical.insert(STUDY_UID, new_analysis("case-1")).await.unwrap();

    clinical
        .update(
            inserted.uid,
            &ClinicalAnalysisUpdateParams {
                status: Some(Status::new(Status::DELETED)),
                ..Default::default()
            },
            &QueryOptions::new(),
        )
        .await
        .expect("mark deleted");

    let err = clinical
        .get_by_uid(inserted.uid, &QueryOptions::new())
        .await
        .expect_err("soft-deleted records do not resolve");
    assert!(matches!(err, Error::NotFound { .. }), "got {err}");

    // Explicitly asking for deleted records finds it again.
    let deleted = clinical
        .get(
            &Query::new()
                .append("studyUid", STUDY_UID)
                .append("status.name", Status::DELETED),
            &QueryOptions::new(),
        )
        .await
        .expect("explicit deleted query");
    assert_eq!(deleted.num_results(), 1);

    catalog.cleanup().await;
}
