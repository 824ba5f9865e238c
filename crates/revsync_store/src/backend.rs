//! Object store trait definition.

use crate::error::StoreResult;
use revsync_protocol::ObjectId;
use std::io::{Read, Write};
use std::sync::Arc;

/// The object-graph operations revsync needs from a repository.
///
/// A store holds immutable objects named by content hash. Each object has an
/// ordered list of immediate parents, forming a finite acyclic graph.
///
/// # Invariants
///
/// - Closure: if an object is present, all of its ancestors are present
/// - `immediate_parents` is stable for an object's lifetime
/// - A payload produced by `serialize_slice` is accepted by
///   `materialize_slice` of any store holding the excluded objects
/// - An empty payload (zero bytes) materializes to nothing
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing and embedding
/// - [`super::GitStore`] - For git repositories on disk
pub trait ObjectStore: Send + Sync {
    /// Reports, for each identifier in order, whether the store has it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    fn exists_all(&self, ids: &[ObjectId]) -> StoreResult<Vec<bool>>;

    /// Lists the immediate parents of an object, in recorded order.
    ///
    /// # Errors
    ///
    /// Returns an error if the object is not in the store.
    fn immediate_parents(&self, id: &ObjectId) -> StoreResult<Vec<ObjectId>>;

    /// Writes a transferable slice of the graph to `out`.
    ///
    /// With `thin` set, the slice is everything reachable from `include`
    /// minus everything reachable from `exclude`, and may rely on the
    /// receiver holding the excluded objects. Without it the slice is the
    /// closure of `include`; exclusions are advisory and cover at most the
    /// exact identifiers listed.
    ///
    /// Writes nothing when the slice is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if an included object is missing or the output
    /// cannot be written.
    fn serialize_slice(
        &self,
        include: &[ObjectId],
        exclude: &[ObjectId],
        thin: bool,
        out: &mut dyn Write,
    ) -> StoreResult<()>;

    /// Reads a slice produced by `serialize_slice` until end of stream and
    /// adds its objects to the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is malformed, references objects
    /// neither in the payload nor in the store, or cannot be read.
    fn materialize_slice(&self, input: &mut dyn Read) -> StoreResult<()>;

    /// Resolves revision names to identifier text.
    ///
    /// The output is not validated; callers parse it.
    ///
    /// # Errors
    ///
    /// Returns an error if a name cannot be resolved.
    fn resolve(&self, revs: &[String]) -> StoreResult<Vec<String>>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for &S {
    fn exists_all(&self, ids: &[ObjectId]) -> StoreResult<Vec<bool>> {
        (**self).exists_all(ids)
    }

    fn immediate_parents(&self, id: &ObjectId) -> StoreResult<Vec<ObjectId>> {
        (**self).immediate_parents(id)
    }

    fn serialize_slice(
        &self,
        include: &[ObjectId],
        exclude: &[ObjectId],
        thin: bool,
        out: &mut dyn Write,
    ) -> StoreResult<()> {
        (**self).serialize_slice(include, exclude, thin, out)
    }

    fn materialize_slice(&self, input: &mut dyn Read) -> StoreResult<()> {
        (**self).materialize_slice(input)
    }

    fn resolve(&self, revs: &[String]) -> StoreResult<Vec<String>> {
        (**self).resolve(revs)
    }
}

impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    fn exists_all(&self, ids: &[ObjectId]) -> StoreResult<Vec<bool>> {
        (**self).exists_all(ids)
    }

    fn immediate_parents(&self, id: &ObjectId) -> StoreResult<Vec<ObjectId>> {
        (**self).immediate_parents(id)
    }

    fn serialize_slice(
        &self,
        include: &[ObjectId],
        exclude: &[ObjectId],
        thin: bool,
        out: &mut dyn Write,
    ) -> StoreResult<()> {
        (**self).serialize_slice(include, exclude, thin, out)
    }

    fn materialize_slice(&self, input: &mut dyn Read) -> StoreResult<()> {
        (**self).materialize_slice(input)
    }

    fn resolve(&self, revs: &[String]) -> StoreResult<Vec<String>> {
        (**self).resolve(revs)
    }
}
