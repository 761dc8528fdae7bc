//! MongoDB backend
//!
//! Collection wiring, query/update translation and the per-entity
//! adaptors. [`CatalogMongoStore`] owns the database handle and hands out
//! the adaptors; everything below it is per-call and stateless.

pub mod auth;
pub mod clinical;
pub mod collection;
pub mod interpretation;
pub mod iterator;
pub mod metadata;
pub mod query_utils;
pub mod study;
pub mod update;

pub use auth::build_auth_filter;
pub use clinical::{
    parse_query, ClinicalAnalysisAdaptor, ClinicalAnalysisConverter, ClinicalAnalysisUpdateParams,
    ClinicalParam,
};
pub use collection::CatalogCollection;
pub use interpretation::{InterpretationAdaptor, UidExists};
pub use iterator::{CatalogCursor, DocumentConverter, NativeConverter};
pub use metadata::UidGenerator;
pub use study::StudyAdaptor;
pub use update::UpdateDocument;

use ::mongodb::options::ClientOptions;
use ::mongodb::{Client, Database};
use bson::doc;
use std::time::Duration;

use crate::error::Result;

const CLINICAL_COLLECTION: &str = "clinical";
const STUDY_COLLECTION: &str = "study";
const INTERPRETATION_COLLECTION: &str = "interpretation";
const METADATA_COLLECTION: &str = "metadata";

/// Handle to one catalog database and its entity adaptors.
#[derive(Debug, Clone)]
pub struct CatalogMongoStore {
    database: Database,
    clinical: ClinicalAnalysisAdaptor,
    studies: StudyAdaptor,
    interpretations: InterpretationAdaptor,
}

impl CatalogMongoStore {
    /// Connect to a deployment and open (or create) the named database.
    pub async fn connect(uri: &str, database_name: &str) -> Result<Self> {
        let mut options = ClientOptions::parse(uri).await?;
        options
            .server_selection_timeout
            .get_or_insert(Duration::from_secs(5));
        let client = Client::with_options(options)?;
        Ok(Self::new(client.database(database_name)))
    }

    pub fn new(database: Database) -> Self {
        let collection =
            |name: &str| CatalogCollection::new(database.collection(name));

        let studies = StudyAdaptor::new(collection(STUDY_COLLECTION));
        let interpretations = InterpretationAdaptor::new(collection(INTERPRETATION_COLLECTION));
        let uid_generator = UidGenerator::new(collection(METADATA_COLLECTION));
        let clinical = ClinicalAnalysisAdaptor::new(
            collection(CLINICAL_COLLECTION),
            studies.clone(),
            interpretations.clone(),
            uid_generator,
        );

        CatalogMongoStore {
            database,
            clinical,
            studies,
            interpretations,
        }
    }

    /// Create the uniqueness indexes the adaptors rely on. Run once at
    /// deployment bootstrap; safe to repeat.
    pub async fn ensure_indexes(&self) -> Result<()> {
        self.clinical.ensure_indexes().await
    }

    /// Round-trip to the server; errors are `Store` errors.
    pub async fn ping(&self) -> Result<()> {
        self.database.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    pub fn clinical(&self) -> &ClinicalAnalysisAdaptor {
        &self.clinical
    }

    pub fn studies(&self) -> &StudyAdaptor {
        &self.studies
    }

    pub fn interpretations(&self) -> &InterpretationAdaptor {
        &self.interpretations
    }

    pub fn database_name(&self) -> &str {
        self.database.name()
    }

    /// Drop the whole database. Test harness use.
    pub async fn drop_database(&self) -> Result<()> {
        self.database.drop(None).await?;
        Ok(())
    }
}
