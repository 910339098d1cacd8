// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Typed per-node side data.
//!
//! Every node carries an [`Annotations`] map from type identity to an
//! opaque payload: attach any `'static` type to any node without
//! changing the tree structure. Each node holds at most one value per
//! type.
//!
//! Annotations round-trip through the tree serializer only for types
//! registered in a [`SerdesRegistry`]: registration pairs a braced name
//! (`{name}`) with a serialize/deserialize function pair. Unregistered
//! annotations survive in memory but are silently skipped on write;
//! unknown braced keys are silently dropped on read.
//!
//! A process-wide default registry backs the convenience entry points
//! in [`crate::serdes`]; it is append-only, populated at startup, and
//! safe for concurrent reads afterward. Embedders that prefer explicit
//! state can thread their own registry through the `*_with` drivers.

use std::any::{type_name, Any, TypeId};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::sync::{LazyLock, RwLock};

use arbor_cbor::{CodecError, MapReader, MapWriter, SchemaError};

use crate::error::MissingAnnotation;

type Slot = Rc<RefCell<dyn Any>>;

type SerializeFn =
    Box<dyn for<'w> Fn(&dyn Any, &mut MapWriter<'w>) -> Result<(), CodecError> + Send + Sync>;
type DeserializeFn =
    Box<dyn for<'a> Fn(&MapReader<'a>) -> Result<Slot, SchemaError> + Send + Sync>;

struct SerializerEntry {
    braced_name: String,
    serialize: SerializeFn,
}

/// Append-only table pairing annotation types with their CBOR
/// serialize/deserialize functions.
#[derive(Default)]
pub struct SerdesRegistry {
    serializers: HashMap<TypeId, SerializerEntry>,
    deserializers: HashMap<String, (TypeId, DeserializeFn)>,
}

impl SerdesRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a serialize/deserialize pair for `T`.
    ///
    /// The serialize function writes the value as zero or more map
    /// entries; the deserialize function rebuilds it from those
    /// entries. Type information is carried by the map key, which is
    /// `name` wrapped in braces — or, when `name` is `None`, the
    /// compiler-provided type name. Registering the same type again
    /// replaces the previous pair.
    pub fn register<T, S, D>(&mut self, name: Option<&str>, serialize: S, deserialize: D)
    where
        T: 'static,
        S: for<'w> Fn(&T, &mut MapWriter<'w>) -> Result<(), CodecError> + Send + Sync + 'static,
        D: for<'a> Fn(&MapReader<'a>) -> Result<T, SchemaError> + Send + Sync + 'static,
    {
        let braced_name = format!("{{{}}}", name.unwrap_or_else(|| type_name::<T>()));
        self.serializers.insert(
            TypeId::of::<T>(),
            SerializerEntry {
                braced_name: braced_name.clone(),
                serialize: Box::new(move |any, map| {
                    // The table is keyed by TypeId, so the downcast only
                    // misses for a foreign slot; skip it like an
                    // unregistered annotation.
                    let Some(value) = any.downcast_ref::<T>() else {
                        return Ok(());
                    };
                    serialize(value, map)
                }),
            },
        );
        self.deserializers.insert(
            braced_name,
            (
                TypeId::of::<T>(),
                Box::new(move |map| {
                    let value = deserialize(map)?;
                    Ok(Rc::new(RefCell::new(value)) as Slot)
                }),
            ),
        );
    }

    /// Whether a pair is registered for `T`.
    #[must_use]
    pub fn has<T: 'static>(&self) -> bool {
        self.serializers.contains_key(&TypeId::of::<T>())
    }

    fn serializer(&self, type_id: TypeId) -> Option<&SerializerEntry> {
        self.serializers.get(&type_id)
    }

    fn deserializer(&self, key: &str) -> Option<&(TypeId, DeserializeFn)> {
        self.deserializers.get(key)
    }
}

impl fmt::Debug for SerdesRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerdesRegistry")
            .field("registered", &self.serializers.len())
            .finish()
    }
}

static GLOBAL: LazyLock<RwLock<SerdesRegistry>> =
    LazyLock::new(|| RwLock::new(SerdesRegistry::new()));

/// Registers a serialize/deserialize pair for `T` in the process-wide
/// registry. Call during startup, before any serialization runs.
pub fn register_annotation<T, S, D>(name: Option<&str>, serialize: S, deserialize: D)
where
    T: 'static,
    S: for<'w> Fn(&T, &mut MapWriter<'w>) -> Result<(), CodecError> + Send + Sync + 'static,
    D: for<'a> Fn(&MapReader<'a>) -> Result<T, SchemaError> + Send + Sync + 'static,
{
    let mut guard = match GLOBAL.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    guard.register(name, serialize, deserialize);
}

/// Runs `f` against the process-wide registry.
pub fn with_global_registry<R>(f: impl FnOnce(&SerdesRegistry) -> R) -> R {
    let guard = match GLOBAL.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    f(&guard)
}

/// Per-node map from type identity to an attached payload.
///
/// Slots are shared between clones of an annotation map (a node
/// `copy()` shares them; [`Annotations::copy_from`] copies the value).
/// Iteration order is `TypeId` order, which is stable within a process,
/// so serialization output is deterministic per run.
#[derive(Default)]
pub struct Annotations {
    map: BTreeMap<TypeId, Slot>,
}

impl Annotations {
    /// Creates an empty annotation map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attached annotations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no annotations are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Attaches `value`, replacing any previous annotation of type `T`.
    pub fn set<T: 'static>(&mut self, value: T) {
        self.map.insert(TypeId::of::<T>(), Rc::new(RefCell::new(value)));
    }

    /// Whether an annotation of type `T` is attached.
    #[must_use]
    pub fn has<T: 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    /// Borrows the annotation of type `T`.
    ///
    /// # Errors
    ///
    /// Fails with [`MissingAnnotation`] when absent.
    pub fn get<T: 'static>(&self) -> Result<Ref<'_, T>, MissingAnnotation> {
        let slot = self.map.get(&TypeId::of::<T>()).ok_or(MissingAnnotation {
            type_name: type_name::<T>(),
        })?;
        Ref::filter_map(slot.borrow(), |any| any.downcast_ref::<T>()).map_err(|_| {
            MissingAnnotation {
                type_name: type_name::<T>(),
            }
        })
    }

    /// Mutably borrows the annotation of type `T`.
    ///
    /// # Errors
    ///
    /// Fails with [`MissingAnnotation`] when absent.
    pub fn get_mut<T: 'static>(&self) -> Result<RefMut<'_, T>, MissingAnnotation> {
        let slot = self.map.get(&TypeId::of::<T>()).ok_or(MissingAnnotation {
            type_name: type_name::<T>(),
        })?;
        RefMut::filter_map(slot.borrow_mut(), |any| any.downcast_mut::<T>()).map_err(|_| {
            MissingAnnotation {
                type_name: type_name::<T>(),
            }
        })
    }

    /// Detaches the annotation of type `T`, if any.
    pub fn erase<T: 'static>(&mut self) {
        self.map.remove(&TypeId::of::<T>());
    }

    /// Copies the annotation of type `T` from `source`; when `source`
    /// has none, any annotation of that type here is removed.
    pub fn copy_from<T: 'static + Clone>(&mut self, source: &Annotations) {
        match source.get::<T>() {
            Ok(value) => {
                let copied = value.clone();
                drop(value);
                self.set(copied);
            }
            Err(_) => self.erase::<T>(),
        }
    }

    /// Writes every annotation with a registered pair into `map` under
    /// its braced key. Unregistered annotations are skipped.
    ///
    /// # Errors
    ///
    /// Fails when the codec rejects a write or a user serializer fails.
    pub fn serialize(
        &self,
        map: &mut MapWriter<'_>,
        registry: &SerdesRegistry,
    ) -> Result<(), CodecError> {
        for (type_id, slot) in &self.map {
            if let Some(entry) = registry.serializer(*type_id) {
                let mut sub = map.append_map(&entry.braced_name)?;
                (entry.serialize)(&*slot.borrow(), &mut sub)?;
                sub.close()?;
            }
        }
        Ok(())
    }

    /// Reads every braced key of `map` that names a registered type;
    /// unknown braced keys are dropped.
    ///
    /// # Errors
    ///
    /// Fails when a registered deserializer rejects its payload.
    pub fn deserialize(
        map: &MapReader<'_>,
        registry: &SerdesRegistry,
    ) -> Result<Self, SchemaError> {
        let mut out = Self::new();
        for (key, value) in map.iter() {
            if !(key.starts_with('{') && key.ends_with('}')) {
                continue;
            }
            if let Some((type_id, deserialize)) = registry.deserializer(key) {
                let sub = value.as_map()?;
                out.map.insert(*type_id, deserialize(&sub)?);
            }
        }
        Ok(out)
    }
}

impl Clone for Annotations {
    /// Shares the annotation slots with the clone.
    fn clone(&self) -> Self {
        Self {
            map: self.map.clone(),
        }
    }
}

impl fmt::Debug for Annotations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Annotations")
            .field("count", &self.map.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Marker(i64);

    #[derive(Debug, Clone, PartialEq)]
    struct Label(String);

    #[test]
    fn set_get_erase() {
        let mut annotations = Annotations::new();
        assert!(!annotations.has::<Marker>());
        assert!(annotations.get::<Marker>().is_err());

        annotations.set(Marker(3));
        assert!(annotations.has::<Marker>());
        assert_eq!(*annotations.get::<Marker>().unwrap(), Marker(3));

        annotations.set(Marker(4));
        assert_eq!(annotations.len(), 1);
        assert_eq!(*annotations.get::<Marker>().unwrap(), Marker(4));

        annotations.get_mut::<Marker>().unwrap().0 = 9;
        assert_eq!(annotations.get::<Marker>().unwrap().0, 9);

        annotations.erase::<Marker>();
        assert!(annotations.is_empty());
    }

    #[test]
    fn copy_from_copies_or_erases() {
        let mut source = Annotations::new();
        source.set(Marker(1));

        let mut target = Annotations::new();
        target.set(Label("stale".into()));
        target.copy_from::<Marker>(&source);
        assert_eq!(*target.get::<Marker>().unwrap(), Marker(1));

        // Copies are independent values.
        target.get_mut::<Marker>().unwrap().0 = 5;
        assert_eq!(source.get::<Marker>().unwrap().0, 1);

        // Absent on the source erases on the target.
        let empty = Annotations::new();
        target.copy_from::<Marker>(&empty);
        assert!(!target.has::<Marker>());
        assert!(target.has::<Label>());
    }

    #[test]
    fn registered_annotations_roundtrip() {
        let mut registry = SerdesRegistry::new();
        registry.register::<Marker, _, _>(
            Some("marker"),
            |value, map| map.append_int("value", value.0),
            |map| Ok(Marker(map.at("value")?.as_int()?)),
        );

        let mut annotations = Annotations::new();
        annotations.set(Marker(42));
        annotations.set(Label("dropped".into()));

        let mut buf = Vec::new();
        {
            let mut map = arbor_cbor::Writer::new(&mut buf).root().unwrap();
            annotations.serialize(&mut map, &registry).unwrap();
            map.close().unwrap();
        }

        let reader = arbor_cbor::Reader::new(&buf).unwrap();
        let map = reader.as_map().unwrap();
        // The unregistered Label was skipped.
        assert_eq!(map.len(), 1);
        assert!(map.contains("{marker}"));

        let restored = Annotations::deserialize(&map, &registry).unwrap();
        assert_eq!(*restored.get::<Marker>().unwrap(), Marker(42));

        // A reader with no registration silently drops the annotation.
        let bare = SerdesRegistry::new();
        let dropped = Annotations::deserialize(&map, &bare).unwrap();
        assert!(dropped.is_empty());
    }
}
