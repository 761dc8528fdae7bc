//! Operation result containers

/// Result of a read operation.
///
/// `total` is populated only when the adaptor could not tell from the page
/// itself how many documents match: when the number of returned rows equals
/// the requested limit, a dedicated count query runs and fills it in.
/// Otherwise the page was not truncated and `num_results` is authoritative.
#[derive(Debug, Clone, Default)]
pub struct CatalogResult<T> {
    pub results: Vec<T>,
    /// Total matching documents, when separately counted (see above).
    pub total: Option<u64>,
}

impl<T> CatalogResult<T> {
    pub fn new(results: Vec<T>) -> Self {
        CatalogResult {
            results,
            total: None,
        }
    }

    pub fn num_results(&self) -> usize {
        self.results.len()
    }

    pub fn first(&self) -> Option<&T> {
        self.results.first()
    }

    pub fn into_first(self) -> Option<T> {
        self.results.into_iter().next()
    }
}

/// Result of an update operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteResult {
    /// Documents matched by the update filter.
    pub matched: u64,
    /// Documents actually modified.
    pub modified: u64,
}
