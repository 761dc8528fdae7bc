//! Query parameter registry
//!
//! Each entity type enumerates its queryable fields in a compile-time map:
//! key, semantic type, nothing else. Keys outside the map are rejected at
//! translation time rather than passed through, so callers cannot invent
//! filter keys the collection has no index discipline for.
//!
//! Resolution is two-step: exact key first, then the first path segment,
//! which lets a registered family entry (`attributes`, `status`) cover its
//! nested keys (`attributes.centre`, `status.date`) without enumerating
//! every spelling.

use crate::error::{Error, Result};

/// Semantic type of a queryable field. Drives which comparison operators
/// are legal and how operands are coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Text,
    TextArray,
    Integer,
    IntegerArray,
    Decimal,
    Double,
    Boolean,
    Date,
}

impl ParamType {
    /// Whether operands are numbers.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ParamType::Integer | ParamType::IntegerArray | ParamType::Decimal | ParamType::Double
        )
    }
}

/// Resolve a query key against an entity's registry map.
///
/// Exact match wins; otherwise the first dotted segment is tried so family
/// entries cover their nested keys. Unknown keys are an error, never
/// ignored.
pub fn resolve<P: Copy>(map: &phf::Map<&'static str, P>, key: &str) -> Result<P> {
    if let Some(param) = map.get(key) {
        return Ok(*param);
    }
    if let Some((head, _)) = key.split_once('.') {
        if let Some(param) = map.get(head) {
            return Ok(*param);
        }
    }
    Err(Error::UnknownParameter {
        param: key.to_string(),
    })
}
