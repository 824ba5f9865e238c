//! In-memory object store for testing and embedding.

use crate::backend::ObjectStore;
use crate::error::{StoreError, StoreResult};
use parking_lot::RwLock;
use revsync_protocol::{ObjectId, OBJECT_ID_LEN};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::io::{Read, Write};

/// One object as carried in an in-memory slice payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedObject {
    /// Object identifier.
    pub id: ObjectId,
    /// Immediate parents.
    pub parents: Vec<ObjectId>,
    /// Object content.
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    parents: Vec<ObjectId>,
    payload: Vec<u8>,
}

/// An in-memory object store.
///
/// Objects are content-addressed: the identifier is derived from the
/// parent list and the payload, so a slice can be verified on arrival.
/// Named references are kept for [`ObjectStore::resolve`].
///
/// This store is suitable for:
/// - Unit and integration tests of the negotiation protocol
/// - Embedding revsync over a non-git object graph
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use revsync_store::{InMemoryStore, ObjectStore};
///
/// let store = InMemoryStore::new();
/// let root = store.insert(&[], b"root").unwrap();
/// let child = store.insert(&[root], b"child").unwrap();
/// assert_eq!(store.immediate_parents(&child).unwrap(), vec![root]);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    objects: RwLock<HashMap<ObjectId, StoredObject>>,
    refs: RwLock<BTreeMap<String, ObjectId>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the identifier of an object with the given content.
    #[must_use]
    pub fn object_id(parents: &[ObjectId], payload: &[u8]) -> ObjectId {
        let mut hasher = Sha256::new();
        for parent in parents {
            hasher.update(b"parent ");
            hasher.update(parent.to_hex().as_bytes());
            hasher.update(b"\n");
        }
        hasher.update(b"\n");
        hasher.update(payload);
        let digest = hasher.finalize();
        let mut bytes = [0u8; OBJECT_ID_LEN];
        bytes.copy_from_slice(&digest[..OBJECT_ID_LEN]);
        ObjectId::from_bytes(bytes)
    }

    /// Adds an object whose parents are already stored.
    ///
    /// Inserting an existing object is a no-op returning the same id.
    pub fn insert(&self, parents: &[ObjectId], payload: &[u8]) -> StoreResult<ObjectId> {
        let id = Self::object_id(parents, payload);
        let mut objects = self.objects.write();
        if let Some(missing) = parents.iter().find(|p| !objects.contains_key(p)) {
            return Err(StoreError::MissingObject(*missing));
        }
        objects.entry(id).or_insert_with(|| StoredObject {
            parents: parents.to_vec(),
            payload: payload.to_vec(),
        });
        Ok(id)
    }

    /// Points a named reference at an object.
    pub fn set_ref(&self, name: impl Into<String>, id: ObjectId) {
        self.refs.write().insert(name.into(), id);
    }

    /// Returns the object a named reference points at.
    #[must_use]
    pub fn get_ref(&self, name: &str) -> Option<ObjectId> {
        self.refs.read().get(name).copied()
    }

    /// Returns true if the store holds the object.
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.read().contains_key(id)
    }

    /// Returns an object's content.
    #[must_use]
    pub fn payload(&self, id: &ObjectId) -> Option<Vec<u8>> {
        self.objects.read().get(id).map(|o| o.payload.clone())
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if the store holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// All stored identifiers, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<_> = self.objects.read().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Everything reachable from `starts`, ignoring unknown starting points.
    fn closure(objects: &HashMap<ObjectId, StoredObject>, starts: &[ObjectId]) -> HashSet<ObjectId> {
        let mut seen = HashSet::new();
        let mut stack: Vec<ObjectId> = starts.to_vec();
        while let Some(id) = stack.pop() {
            let Some(object) = objects.get(&id) else {
                continue;
            };
            if seen.insert(id) {
                stack.extend(object.parents.iter().copied());
            }
        }
        seen
    }
}

impl ObjectStore for InMemoryStore {
    fn exists_all(&self, ids: &[ObjectId]) -> StoreResult<Vec<bool>> {
        let objects = self.objects.read();
        Ok(ids.iter().map(|id| objects.contains_key(id)).collect())
    }

    fn immediate_parents(&self, id: &ObjectId) -> StoreResult<Vec<ObjectId>> {
        self.objects
            .read()
            .get(id)
            .map(|o| o.parents.clone())
            .ok_or(StoreError::MissingObject(*id))
    }

    fn serialize_slice(
        &self,
        include: &[ObjectId],
        exclude: &[ObjectId],
        thin: bool,
        out: &mut dyn Write,
    ) -> StoreResult<()> {
        let objects = self.objects.read();
        if let Some(missing) = include.iter().find(|id| !objects.contains_key(id)) {
            return Err(StoreError::MissingObject(*missing));
        }

        let excluded = if thin {
            Self::closure(&objects, exclude)
        } else {
            exclude.iter().copied().collect()
        };

        let mut seen = HashSet::new();
        let mut queue: VecDeque<ObjectId> = include.iter().copied().collect();
        let mut packed = Vec::new();
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            // Thin exclusions cover whole ancestries; full-mode ones only the id itself.
            let skipped = excluded.contains(&id);
            if skipped && thin {
                continue;
            }
            let object = match objects.get(&id) {
                Some(object) => object,
                None if skipped => continue,
                None => return Err(StoreError::MissingObject(id)),
            };
            queue.extend(object.parents.iter().copied());
            if skipped {
                continue;
            }
            packed.push(PackedObject {
                id,
                parents: object.parents.clone(),
                payload: object.payload.clone(),
            });
        }

        if packed.is_empty() {
            return Ok(());
        }
        tracing::debug!(objects = packed.len(), thin, "serializing in-memory slice");
        ciborium::into_writer(&packed, out).map_err(|e| match e {
            ciborium::ser::Error::Io(io) => StoreError::Io(io),
            ciborium::ser::Error::Value(msg) => StoreError::Corrupted(msg),
        })
    }

    fn materialize_slice(&self, input: &mut dyn Read) -> StoreResult<()> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        if bytes.is_empty() {
            return Ok(());
        }

        let packed: Vec<PackedObject> = ciborium::from_reader(bytes.as_slice())
            .map_err(|e| StoreError::Corrupted(format!("undecodable slice: {e}")))?;

        for object in &packed {
            let expected = Self::object_id(&object.parents, &object.payload);
            if expected != object.id {
                return Err(StoreError::Corrupted(format!(
                    "object {} hashes to {}",
                    object.id, expected
                )));
            }
        }

        let incoming: HashSet<ObjectId> = packed.iter().map(|o| o.id).collect();
        let mut objects = self.objects.write();
        for object in &packed {
            if let Some(missing) = object
                .parents
                .iter()
                .find(|p| !incoming.contains(p) && !objects.contains_key(p))
            {
                return Err(StoreError::MissingObject(*missing));
            }
        }

        let count = packed.len();
        for object in packed {
            objects.entry(object.id).or_insert(StoredObject {
                parents: object.parents,
                payload: object.payload,
            });
        }
        tracing::debug!(objects = count, "materialized in-memory slice");
        Ok(())
    }

    fn resolve(&self, revs: &[String]) -> StoreResult<Vec<String>> {
        let refs = self.refs.read();
        Ok(revs
            .iter()
            .map(|rev| match refs.get(rev) {
                Some(id) => id.to_hex(),
                None => rev.clone(),
            })
            .collect())
    }
}
