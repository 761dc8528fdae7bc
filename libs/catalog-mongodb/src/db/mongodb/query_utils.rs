//! Query-to-filter translation helpers
//!
//! Turns registry-typed query values into MongoDB filter fragments. The
//! value grammar is `[<op>]<operand>` with op one of `<`, `<=`, `>`, `>=`,
//! `==`, `!=`, `~` (regex), `!~`; a bare operand means equality. Within one
//! value, commas are OR and semicolons are AND: `flags=urgent,review` is
//! either flag, `release=>=2;<5` is a range.
//!
//! Date operands come in display precision (`yyyyMMdd[HHmm[ss]]`) and are
//! compared against the indexed date sibling of the display field. A
//! date-only operand spans its whole day: `==20240301` matches the day,
//! `<=20240301` includes it, `>20240301` starts after it.

use bson::{doc, Bson, Document};
use helix_models::time;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::params::ParamType;
use crate::query::{value_to_string, Query};

/// Internal unique id field.
pub const PRIVATE_UID: &str = "uid";
/// Owning-study back-reference field.
pub const PRIVATE_STUDY_UID: &str = "studyUid";
/// Indexed creation instant; sibling of the `creationDate` display string.
pub const PRIVATE_CREATION_DATE: &str = "_creationDate";
/// Indexed modification instant; sibling of `modificationDate`.
pub const PRIVATE_MODIFICATION_DATE: &str = "_modificationDate";
/// Entity-level permission grants, `<member>__<PERMISSION>` strings.
pub const PRIVATE_ACL: &str = "_acl";
/// Permission rules already applied to the document.
pub const PERMISSION_RULES_APPLIED: &str = "_permissionRulesApplied";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Regex,
    NotRegex,
}

/// Split a grammar item into its operator and operand. Two-character
/// operators are matched first so `<=` never parses as `<` + `=...`.
pub fn split_operator(item: &str) -> (ComparisonOp, &str) {
    const PREFIXES: &[(&str, ComparisonOp)] = &[
        ("<=", ComparisonOp::Lte),
        (">=", ComparisonOp::Gte),
        ("==", ComparisonOp::Eq),
        ("!=", ComparisonOp::Ne),
        ("!~", ComparisonOp::NotRegex),
        ("=~", ComparisonOp::Regex),
        ("<", ComparisonOp::Lt),
        (">", ComparisonOp::Gt),
        ("~", ComparisonOp::Regex),
        ("=", ComparisonOp::Eq),
    ];
    for (prefix, op) in PREFIXES {
        if let Some(rest) = item.strip_prefix(prefix) {
            return (*op, rest);
        }
    }
    (ComparisonOp::Eq, item)
}

/// One parsed comparison, kept in a shape that still allows merging plain
/// equalities into `$in`/`$nin` sets.
enum Condition {
    Eq(Bson),
    Ne(Bson),
    Other(Document),
}

/// Translate a single query entry into filter fragments and push them onto
/// the AND list. Semicolon groups land as separate fragments; commas
/// within a group are OR-combined (plain equalities collapse to `$in`).
pub fn add_auto_or_query(
    mongo_key: &str,
    query_key: &str,
    value: &Value,
    param_type: ParamType,
    and_list: &mut Vec<Document>,
) -> Result<()> {
    let rendered = value_to_string(value);
    if rendered.is_empty() {
        return Ok(());
    }
    for group in rendered.split(';').filter(|g| !g.trim().is_empty()) {
        let conditions = group
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| build_condition(mongo_key, query_key, item, param_type))
            .collect::<Result<Vec<_>>>()?;
        if !conditions.is_empty() {
            and_list.push(combine_or(mongo_key, conditions));
        }
    }
    Ok(())
}

fn build_condition(
    mongo_key: &str,
    query_key: &str,
    item: &str,
    param_type: ParamType,
) -> Result<Condition> {
    let (op, raw) = split_operator(item);
    if param_type == ParamType::Date {
        return build_date_condition(mongo_key, query_key, op, raw);
    }

    let operand = parse_operand(query_key, item, raw, param_type)?;
    match op {
        ComparisonOp::Eq => Ok(Condition::Eq(operand)),
        ComparisonOp::Ne => Ok(Condition::Ne(operand)),
        ComparisonOp::Lt | ComparisonOp::Lte | ComparisonOp::Gt | ComparisonOp::Gte => {
            if !param_type.is_numeric() {
                return Err(Error::malformed(
                    query_key,
                    item,
                    "ordering operators require a numeric or date field",
                ));
            }
            let mongo_op = match op {
                ComparisonOp::Lt => "$lt",
                ComparisonOp::Lte => "$lte",
                ComparisonOp::Gt => "$gt",
                _ => "$gte",
            };
            Ok(Condition::Other(doc! { mongo_key: { mongo_op: operand } }))
        }
        ComparisonOp::Regex | ComparisonOp::NotRegex => {
            if !matches!(param_type, ParamType::Text | ParamType::TextArray) {
                return Err(Error::malformed(
                    query_key,
                    item,
                    "regex operators require a text field",
                ));
            }
            if op == ComparisonOp::Regex {
                Ok(Condition::Other(doc! { mongo_key: { "$regex": raw } }))
            } else {
                Ok(Condition::Other(
                    doc! { mongo_key: { "$not": { "$regex": raw } } },
                ))
            }
        }
    }
}

fn parse_operand(query_key: &str, item: &str, raw: &str, param_type: ParamType) -> Result<Bson> {
    match param_type {
        ParamType::Text | ParamType::TextArray => Ok(Bson::String(raw.to_string())),
        ParamType::Integer | ParamType::IntegerArray => raw
            .parse::<i64>()
            .map(Bson::Int64)
            .map_err(|_| Error::malformed(query_key, item, "expected an integer operand")),
        ParamType::Decimal | ParamType::Double => raw
            .parse::<f64>()
            .map(Bson::Double)
            .map_err(|_| Error::malformed(query_key, item, "expected a numeric operand")),
        ParamType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" => Ok(Bson::Boolean(true)),
            "false" => Ok(Bson::Boolean(false)),
            _ => Err(Error::malformed(
                query_key,
                item,
                "expected 'true' or 'false'",
            )),
        },
        ParamType::Date => Err(Error::malformed(
            query_key,
            item,
            "date operands are handled by the date filter",
        )),
    }
}

fn build_date_condition(
    mongo_key: &str,
    query_key: &str,
    op: ComparisonOp,
    raw: &str,
) -> Result<Condition> {
    let instant = time::parse_display(raw).ok_or_else(|| {
        Error::malformed(query_key, raw, "expected a yyyyMMdd[HHmm[ss]] timestamp")
    })?;
    let start = bson::DateTime::from_chrono(instant);
    let day_end = bson::DateTime::from_chrono(instant + chrono::Duration::days(1));
    let date_only = time::is_date_only(raw);

    let condition = match op {
        ComparisonOp::Eq if date_only => {
            doc! { mongo_key: { "$gte": start, "$lt": day_end } }
        }
        ComparisonOp::Eq => doc! { mongo_key: { "$eq": start } },
        ComparisonOp::Ne if date_only => {
            doc! { mongo_key: { "$not": { "$gte": start, "$lt": day_end } } }
        }
        ComparisonOp::Ne => doc! { mongo_key: { "$ne": start } },
        ComparisonOp::Lt => doc! { mongo_key: { "$lt": start } },
        ComparisonOp::Lte if date_only => doc! { mongo_key: { "$lt": day_end } },
        ComparisonOp::Lte => doc! { mongo_key: { "$lte": start } },
        ComparisonOp::Gt if date_only => doc! { mongo_key: { "$gte": day_end } },
        ComparisonOp::Gt => doc! { mongo_key: { "$gt": start } },
        ComparisonOp::Gte => doc! { mongo_key: { "$gte": start } },
        ComparisonOp::Regex | ComparisonOp::NotRegex => {
            return Err(Error::malformed(
                query_key,
                raw,
                "regex operators cannot apply to date fields",
            ));
        }
    };
    Ok(Condition::Other(condition))
}

fn combine_or(mongo_key: &str, mut conditions: Vec<Condition>) -> Document {
    if conditions.len() == 1 {
        return condition_document(mongo_key, conditions.remove(0));
    }
    if conditions.iter().all(|c| matches!(c, Condition::Eq(_))) {
        let values: Vec<Bson> = conditions
            .into_iter()
            .map(|c| match c {
                Condition::Eq(v) => v,
                _ => unreachable!(),
            })
            .collect();
        return doc! { mongo_key: { "$in": values } };
    }
    if conditions.iter().all(|c| matches!(c, Condition::Ne(_))) {
        let values: Vec<Bson> = conditions
            .into_iter()
            .map(|c| match c {
                Condition::Ne(v) => v,
                _ => unreachable!(),
            })
            .collect();
        return doc! { mongo_key: { "$nin": values } };
    }
    let branches: Vec<Document> = conditions
        .into_iter()
        .map(|c| condition_document(mongo_key, c))
        .collect();
    doc! { "$or": branches }
}

fn condition_document(mongo_key: &str, condition: Condition) -> Document {
    match condition {
        Condition::Eq(v) => doc! { mongo_key: v },
        Condition::Ne(v) => doc! { mongo_key: { "$ne": v } },
        Condition::Other(d) => d,
    }
}

/// Filter for an ontology-term field: each value matches any member of the
/// id/name/source triplet, values OR together. Only equality and `~` make
/// sense here.
pub fn add_ontology_query_filter(
    mongo_key: &str,
    query_key: &str,
    value: &Value,
    and_list: &mut Vec<Document>,
) -> Result<()> {
    let rendered = value_to_string(value);
    let mut or_list = Vec::new();
    for item in rendered
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
    {
        let (op, raw) = split_operator(item);
        let matcher: Bson = match op {
            ComparisonOp::Eq => Bson::String(raw.to_string()),
            ComparisonOp::Regex => doc! { "$regex": raw }.into(),
            _ => {
                return Err(Error::malformed(
                    query_key,
                    item,
                    "ontology fields support only equality and ~",
                ));
            }
        };
        for member in ["id", "name", "source"] {
            or_list.push(doc! { format!("{mongo_key}.{member}"): matcher.clone() });
        }
    }
    match or_list.len() {
        0 => {}
        1 => and_list.push(or_list.remove(0)),
        _ => and_list.push(doc! { "$or": or_list }),
    }
    Ok(())
}

/// Rewrite a free-form attribute query (`attributes`, `battributes`,
/// `nattributes`) from its packed `<name><op><value>` form into per-name
/// entries, so downstream dispatch sees ordinary dotted keys. The typed
/// variants keep their prefix here; the per-entity dispatch maps them onto
/// the shared `attributes.` storage prefix.
pub fn fix_complex_query_param(param: &str, query: &mut Query) -> Result<()> {
    let Some(value) = query.remove(param) else {
        return Ok(());
    };
    let rendered = value_to_string(&value);
    for item in rendered
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
    {
        let split_at = item
            .find(|c| "<>=!~".contains(c))
            .ok_or_else(|| Error::malformed(param, item, "expected <name><op><value>"))?;
        if split_at == 0 {
            return Err(Error::malformed(param, item, "missing attribute name"));
        }
        let (name, expression) = item.split_at(split_at);
        query.put(format!("{param}.{name}"), expression);
    }
    Ok(())
}

/// AND a list of fragments into one filter. An empty list is the match-all
/// filter, which is what unrestricted internal calls want.
pub fn and_filter(mut and_list: Vec<Document>) -> Document {
    match and_list.len() {
        0 => Document::new(),
        1 => and_list.remove(0),
        _ => doc! { "$and": and_list },
    }
}
