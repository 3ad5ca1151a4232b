use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::marker::PhantomData;

use crate::{
    crypto::{CipherState, UNENCRYPTED_SENTINEL},
    error::ApiError,
    models::{
        CreateMovieRequest, CreatePromotionRequest, CreateReviewRequest, Movie, Promotion, Review,
        UpdateMovieRequest, UpdatePromotionRequest, UpdateReviewRequest, Validate,
    },
    repository::{Document, DocumentStoreState, StoredDocument},
};

/// Resource
///
/// Describes one document collection: the typed record it maps to, the payloads
/// that create and patch it, and which of its fields are encrypted at rest.
/// `ResourceService`, the handlers and the routes are all generic over this
/// trait, so the three resources share one implementation.
pub trait Resource: Send + Sync + 'static {
    /// Document store collection name.
    const COLLECTION: &'static str;
    /// Singular display name, used in response messages ("Movie Created").
    const NAME: &'static str;
    /// Plural display name ("Movies Retrieved").
    const PLURAL: &'static str;
    /// Fields stored as `iv:ciphertext` and returned decrypted.
    const SENSITIVE_FIELDS: &'static [&'static str];
    /// Top-level fields a listing may be filtered on.
    const FILTER_FIELDS: &'static [&'static str] = &[];

    type Record: Serialize + DeserializeOwned + Send + Sync + 'static;
    type Create: Validate + Serialize + DeserializeOwned + Send + 'static;
    type Patch: Validate + Serialize + DeserializeOwned + Send + 'static;
}

pub struct Movies;
pub struct Promotions;
pub struct Reviews;

impl Resource for Movies {
    const COLLECTION: &'static str = "movies";
    const NAME: &'static str = "Movie";
    const PLURAL: &'static str = "Movies";
    const SENSITIVE_FIELDS: &'static [&'static str] = &["description"];

    type Record = Movie;
    type Create = CreateMovieRequest;
    type Patch = UpdateMovieRequest;
}

impl Resource for Promotions {
    const COLLECTION: &'static str = "promotions";
    const NAME: &'static str = "Promotion";
    const PLURAL: &'static str = "Promotions";
    const SENSITIVE_FIELDS: &'static [&'static str] = &["description"];

    type Record = Promotion;
    type Create = CreatePromotionRequest;
    type Patch = UpdatePromotionRequest;
}

impl Resource for Reviews {
    const COLLECTION: &'static str = "reviews";
    const NAME: &'static str = "Review";
    const PLURAL: &'static str = "Reviews";
    const SENSITIVE_FIELDS: &'static [&'static str] = &["comment"];
    const FILTER_FIELDS: &'static [&'static str] = &["movieId", "reviewer"];

    type Record = Review;
    type Create = CreateReviewRequest;
    type Patch = UpdateReviewRequest;
}

/// How a failed decryption is handled while mapping a document.
#[derive(Clone, Copy, PartialEq)]
enum DecryptMode {
    // Propagate `DecryptionError`.
    Strict,
    // Replace the field with the sentinel and keep going.
    Degrade,
}

/// ResourceService
///
/// CRUD over one collection. The service owns no records between calls; the
/// document store is the only source of truth. Sensitive fields are encrypted
/// before every write and decrypted after every read, so callers never see
/// ciphertext.
pub struct ResourceService<R> {
    store: DocumentStoreState,
    cipher: CipherState,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for ResourceService<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cipher: self.cipher.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> ResourceService<R> {
    pub fn new(store: DocumentStoreState, cipher: CipherState) -> Self {
        Self {
            store,
            cipher,
            _resource: PhantomData,
        }
    }

    /// list
    ///
    /// Every document in the collection, in store order. One corrupted
    /// ciphertext degrades that field to the sentinel instead of failing the
    /// whole listing.
    pub async fn list(&self) -> Result<Vec<R::Record>, ApiError> {
        let docs = self.store.get_all(R::COLLECTION).await?;
        self.into_records(docs)
    }

    /// list_by
    ///
    /// Documents whose `field` equals `value`. Same degradation rules as `list`.
    pub async fn list_by(&self, field: &str, value: &str) -> Result<Vec<R::Record>, ApiError> {
        let docs = self
            .store
            .query(R::COLLECTION, field, &Value::String(value.to_string()))
            .await?;
        self.into_records(docs)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<R::Record>, ApiError> {
        match self.store.get(R::COLLECTION, id).await? {
            Some(data) => Ok(Some(self.to_record(id, data, DecryptMode::Strict)?)),
            None => Ok(None),
        }
    }

    /// create
    ///
    /// Validates before anything touches the store: an invalid payload performs
    /// no persistence call. Returns the new record with plaintext fields.
    pub async fn create(&self, input: R::Create) -> Result<R::Record, ApiError> {
        input.validate()?;

        let plain = to_document(&input)?;
        let mut stored = plain.clone();
        self.encrypt_fields(&mut stored)?;

        let id = self.store.create(R::COLLECTION, stored).await?;
        tracing::info!(collection = R::COLLECTION, id = %id, "record created");

        from_document::<R>(&id, plain)
    }

    /// update
    ///
    /// Only the fields present in `patch` are written; sensitive ones are
    /// re-encrypted. Returns the merged record as stored, decrypted. The write
    /// has already happened by then, so a corrupted field the patch did not
    /// touch degrades to the sentinel instead of failing the call.
    pub async fn update(&self, id: &str, patch: R::Patch) -> Result<R::Record, ApiError> {
        patch.validate()?;

        let mut changes = to_document(&patch)?;
        self.encrypt_fields(&mut changes)?;

        let merged = self
            .store
            .update(R::COLLECTION, id, changes)
            .await?
            .ok_or_else(|| not_found::<R>(id))?;
        tracing::info!(collection = R::COLLECTION, id = %id, "record updated");

        self.to_record(id, merged, DecryptMode::Degrade)
    }

    /// delete
    ///
    /// Not idempotent: deleting an id that does not exist is `NotFound`, which
    /// keeps it consistent with `get_by_id` answering `None` for the same id.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        if !self.store.delete(R::COLLECTION, id).await? {
            return Err(not_found::<R>(id));
        }
        tracing::info!(collection = R::COLLECTION, id = %id, "record deleted");
        Ok(())
    }

    fn into_records(&self, docs: Vec<StoredDocument>) -> Result<Vec<R::Record>, ApiError> {
        docs.into_iter()
            .map(|doc| self.to_record(&doc.id, doc.data, DecryptMode::Degrade))
            .collect()
    }

    fn encrypt_fields(&self, doc: &mut Document) -> Result<(), ApiError> {
        for field in R::SENSITIVE_FIELDS {
            if let Some(Value::String(plaintext)) = doc.get(*field) {
                let encrypted = self.cipher.encrypt(plaintext)?;
                doc.insert(field.to_string(), Value::String(encrypted));
            }
        }
        Ok(())
    }

    fn to_record(&self, id: &str, mut data: Document, mode: DecryptMode) -> Result<R::Record, ApiError> {
        for field in R::SENSITIVE_FIELDS {
            let decrypted = match data.get(*field) {
                // Never written (legacy record); treated like an empty value.
                None => Ok(UNENCRYPTED_SENTINEL.to_string()),
                Some(Value::String(encoded)) => self.cipher.decrypt(encoded).map_err(ApiError::from),
                Some(_) => Err(ApiError::Decryption(format!("{} is not a string", field))),
            };

            let plaintext = match decrypted {
                Ok(plaintext) => plaintext,
                Err(err) if mode == DecryptMode::Degrade => {
                    tracing::warn!(
                        collection = R::COLLECTION,
                        id = %id,
                        field = *field,
                        error = %err,
                        "sensitive field could not be decrypted; returning sentinel"
                    );
                    UNENCRYPTED_SENTINEL.to_string()
                }
                Err(err) => return Err(err),
            };
            data.insert(field.to_string(), Value::String(plaintext));
        }

        from_document::<R>(id, data)
    }
}

fn not_found<R: Resource>(id: &str) -> ApiError {
    ApiError::NotFound(format!("{} with id \"{}\" not found", R::NAME, id))
}

fn to_document<T: Serialize>(value: &T) -> Result<Document, ApiError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(other) => Err(ApiError::Internal(format!(
            "payload serialized to {} instead of an object",
            other
        ))),
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

/// Maps a stored document onto the typed record. Records deny unknown fields,
/// so a document with an unexpected shape is rejected rather than coerced.
fn from_document<R: Resource>(id: &str, mut data: Document) -> Result<R::Record, ApiError> {
    data.insert("id".to_string(), Value::String(id.to_string()));
    serde_json::from_value(Value::Object(data)).map_err(|e| {
        ApiError::Internal(format!(
            "malformed {} document {}: {}",
            R::COLLECTION,
            id,
            e
        ))
    })
}
