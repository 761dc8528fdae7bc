//! Authorization filter building
//!
//! Every authorized read carries a filter fragment describing which
//! documents the requesting principal may see. The fragment is computed
//! fresh per call from the study document current at that moment —
//! permissions change between calls, so nothing here is cached — and the
//! caller ANDs it into the native filter. An *empty* fragment is returned
//! only for principals with study-wide visibility (owner, `@admins`
//! member, or an explicit study-level grant), where "no restriction" is
//! the correct filter.
//!
//! Grants are stored as `<member>__<PERMISSION>` strings: on the study
//! document for study-level permissions, on each entity document (`_acl`)
//! for per-document permissions. Members are user ids, `@group` ids and
//! the any-user marker `*`.

use bson::{doc, Bson, Document};

use crate::db::mongodb::query_utils::PRIVATE_ACL;
use crate::error::{Error, Result};

/// Any-user member marker, also the principal id of anonymous callers.
pub const ANONYMOUS: &str = "*";

/// Administrators group; members see everything in the study.
pub const ADMINS_GROUP: &str = "@admins";

const OWNER_FIELD: &str = "_ownerId";
const GROUPS_FIELD: &str = "groups";

/// Build the visibility fragment for `user` over one study's entities.
///
/// Returns an empty document when the principal may see every entity, a
/// `_acl` membership filter otherwise. Principals with no relationship to
/// the study at all are rejected with `AuthorizationDenied` — an absent
/// user must not silently receive the anonymous grants.
pub fn build_auth_filter(
    study: &Document,
    user: &str,
    study_permission: &str,
    entity_permission: &str,
) -> Result<Document> {
    if study.get_str(OWNER_FIELD) == Ok(user) {
        return Ok(Document::new());
    }

    let groups = user_groups(study, user);
    if groups.iter().any(|g| g == ADMINS_GROUP) {
        return Ok(Document::new());
    }

    if !is_study_member(study, user, &groups) {
        return Err(Error::AuthorizationDenied {
            user: user.to_string(),
            study_uid: study.get_i64("uid").unwrap_or_default(),
        });
    }

    let mut members: Vec<String> = Vec::with_capacity(groups.len() + 2);
    members.push(user.to_string());
    members.extend(groups);
    if user != ANONYMOUS {
        members.push(ANONYMOUS.to_string());
    }

    let study_acl = acl_entries(study);
    let study_wide = members
        .iter()
        .any(|member| study_acl.contains(&grant(member, study_permission)));
    if study_wide {
        return Ok(Document::new());
    }

    let document_grants: Vec<String> = members
        .iter()
        .map(|member| grant(member, entity_permission))
        .collect();
    Ok(doc! { PRIVATE_ACL: { "$in": document_grants } })
}

fn grant(member: &str, permission: &str) -> String {
    format!("{member}__{permission}")
}

/// Groups of the study the user belongs to.
fn user_groups(study: &Document, user: &str) -> Vec<String> {
    let Ok(groups) = study.get_array(GROUPS_FIELD) else {
        return Vec::new();
    };
    groups
        .iter()
        .filter_map(Bson::as_document)
        .filter(|group| {
            group
                .get_array("userIds")
                .map(|users| users.iter().any(|u| u.as_str() == Some(user)))
                .unwrap_or(false)
        })
        .filter_map(|group| group.get_str("id").ok())
        .map(str::to_string)
        .collect()
}

fn acl_entries(study: &Document) -> Vec<String> {
    let Ok(entries) = study.get_array(PRIVATE_ACL) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(Bson::as_str)
        .map(str::to_string)
        .collect()
}

/// A principal is a member when it owns the study, belongs to one of its
/// groups, holds any direct grant, or the study grants anything to `*`.
fn is_study_member(study: &Document, user: &str, groups: &[String]) -> bool {
    if !groups.is_empty() || user == ANONYMOUS {
        return true;
    }
    let user_prefix = format!("{user}__");
    let anonymous_prefix = format!("{ANONYMOUS}__");
    acl_entries(study)
        .iter()
        .any(|entry| entry.starts_with(&user_prefix) || entry.starts_with(&anonymous_prefix))
}
