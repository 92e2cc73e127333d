//! Document persistence: serializing the component universe and loading it
//! back.
//!
//! The serialized form is a single ordered dictionary keyed by component type
//! name, in template-id (registration) order. Each entry is a two-element
//! array:
//!
//! 1. a *header* dictionary mapping each field name the type declares to a
//!    type-tag stub (an empty blob whose discriminator is the field's
//!    semantic type tag -- the codec has no string scalar kind, so the tag
//!    string rides in the blob discriminator; integer fields use the reserved
//!    [`INT64_TAG`]);
//! 2. a *data* array alternating `Int(entity id)` / `Dict(fields)` pairs in
//!    ascending entity-id order, containing only entities that own the
//!    component. Gaps in the id sequence are preserved exactly -- no
//!    placeholders.
//!
//! Components write and read their fields through [`FieldWriter`] and
//! [`FieldReader`]; the driver below never interprets field payloads.

use tessera_doc::{decode, encode, Blob, Dict, Value};

use crate::component::Component;
use crate::entity::EntityId;
use crate::world::World;
use crate::CoreError;

/// Type tag for integer fields in headers.
pub const INT64_TAG: &str = "int64";

// ---------------------------------------------------------------------------
// FieldWriter / FieldReader -- the component-facing capability interface
// ---------------------------------------------------------------------------

/// Write side of the component field protocol.
///
/// A component's `serialize` callback writes each of its named fields through
/// one of these; the writer accumulates them into the entry's field
/// dictionary in write order.
#[derive(Debug, Default)]
pub struct FieldWriter {
    fields: Dict,
}

impl FieldWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Write an opaque byte payload under `name`, tagged with its semantic
    /// type (e.g. `"mat4"`).
    pub fn write_bytes(&mut self, name: &str, bytes: Vec<u8>, tag: &str) {
        self.fields.insert(name, Value::Blob(Blob::new(tag, bytes)));
    }

    /// Write a signed 64-bit integer field under `name`.
    pub fn write_i64(&mut self, name: &str, value: i64) {
        self.fields.insert(name, Value::Int(value));
    }

    pub(crate) fn into_dict(self) -> Dict {
        self.fields
    }
}

/// Read side of the component field protocol, wrapping one decoded field
/// dictionary.
#[derive(Debug)]
pub struct FieldReader<'a> {
    component: &'static str,
    fields: &'a Dict,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(component: &'static str, fields: &'a Dict) -> Self {
        Self { component, fields }
    }

    /// Read the byte payload written under `name`.
    ///
    /// # Errors
    ///
    /// [`CoreError::MissingField`] if the field is absent,
    /// [`CoreError::TypeMismatch`] if its tag differs from `expected_tag`.
    pub fn read_bytes(&self, name: &str, expected_tag: &str) -> Result<&'a [u8], CoreError> {
        match self.field(name)? {
            Value::Blob(blob) if blob.tag == expected_tag => Ok(&blob.bytes),
            Value::Blob(blob) => Err(self.mismatch(name, expected_tag, &blob.tag)),
            other => Err(self.mismatch(name, expected_tag, other.kind_name())),
        }
    }

    /// Read the integer written under `name`.
    ///
    /// # Errors
    ///
    /// [`CoreError::MissingField`] if the field is absent,
    /// [`CoreError::TypeMismatch`] if it is not an integer.
    pub fn read_i64(&self, name: &str) -> Result<i64, CoreError> {
        match self.field(name)? {
            Value::Int(v) => Ok(*v),
            Value::Blob(blob) => Err(self.mismatch(name, INT64_TAG, &blob.tag)),
            other => Err(self.mismatch(name, INT64_TAG, other.kind_name())),
        }
    }

    fn field(&self, name: &str) -> Result<&'a Value, CoreError> {
        self.fields.get(name).ok_or_else(|| CoreError::MissingField {
            component: self.component.to_owned(),
            field: name.to_owned(),
        })
    }

    fn mismatch(&self, field: &str, expected: &str, found: &str) -> CoreError {
        CoreError::TypeMismatch {
            component: self.component.to_owned(),
            field: field.to_owned(),
            expected: expected.to_owned(),
            found: found.to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Schema capture and validation
// ---------------------------------------------------------------------------

/// Build the header dictionary for `T` by probing a default instance.
///
/// Runs `T::default().serialize(...)` against a throwaway writer (with the
/// null entity id) and keeps only the field names and tags. The callback's
/// skip flag is ignored here -- a schema probe is not persistence.
pub(crate) fn schema_header<T: Component>() -> Dict {
    let mut writer = FieldWriter::new();
    let _ = T::default().serialize(&mut writer, EntityId::NULL);

    let mut header = Dict::new();
    for (name, value) in writer.fields.iter() {
        let tag = match value {
            Value::Blob(blob) => blob.tag.as_str(),
            Value::Int(_) => INT64_TAG,
            // FieldWriter only produces blobs and ints.
            other => unreachable!("unexpected header value kind {}", other.kind_name()),
        };
        header.insert(name, Value::Blob(Blob::new(tag, Vec::new())));
    }
    header
}

/// Check a document's header for `T` against the live type's field schema.
///
/// Every field the live type declares must appear with a matching tag.
/// Extra header fields are tolerated (the reader simply never asks for
/// them).
pub(crate) fn validate_header<T: Component>(header: &Dict) -> Result<(), CoreError> {
    let expected = schema_header::<T>();
    for (field, stub) in expected.iter() {
        let expected_tag = match stub {
            Value::Blob(blob) => blob.tag.as_str(),
            _ => unreachable!("schema_header only emits blob stubs"),
        };
        match header.get(field) {
            None => {
                return Err(CoreError::MissingField {
                    component: T::NAME.to_owned(),
                    field: field.to_owned(),
                })
            }
            Some(Value::Blob(blob)) if blob.tag == expected_tag => {}
            Some(Value::Blob(blob)) => {
                return Err(CoreError::TypeMismatch {
                    component: T::NAME.to_owned(),
                    field: field.to_owned(),
                    expected: expected_tag.to_owned(),
                    found: blob.tag.clone(),
                })
            }
            Some(other) => {
                return Err(CoreError::ComponentDeserialization {
                    component: T::NAME.to_owned(),
                    details: format!(
                        "header entry '{}' must be a tag stub, found {}",
                        field,
                        other.kind_name()
                    ),
                })
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Buffer round-trip
// ---------------------------------------------------------------------------

/// Encode a component document into a self-contained byte buffer.
///
/// The buffer is a single contiguous allocation; ownership transfers to the
/// caller.
pub fn dump(doc: &Dict) -> Vec<u8> {
    encode(&Value::Dict(doc.clone()))
}

/// Decode a byte buffer produced by [`dump`] back into a component document.
///
/// # Errors
///
/// [`CoreError::Document`] on codec-level corruption, or
/// [`CoreError::ComponentDeserialization`] if the root value is not a
/// dictionary.
pub fn load(bytes: &[u8]) -> Result<Dict, CoreError> {
    match decode(bytes)? {
        Value::Dict(doc) => Ok(doc),
        other => Err(CoreError::ComponentDeserialization {
            component: "<root>".to_owned(),
            details: format!("document root must be a dict, found {}", other.kind_name()),
        }),
    }
}

// ---------------------------------------------------------------------------
// World serialization drivers
// ---------------------------------------------------------------------------

impl World {
    /// Serialize every registered component store into a document.
    ///
    /// Types appear in ascending template-id order; each type's data array
    /// lists its owners in ascending entity-id order. Stores are renormalized
    /// first. Instances whose serialize callback returns `false` are omitted.
    ///
    /// Serializing twice without intervening mutation yields structurally
    /// identical (and byte-identical, under [`dump`]) documents.
    pub fn serialize_components(&mut self) -> Dict {
        self.renormalize(false);

        let mut root = Dict::new();
        for info in self.registry.iter() {
            let store = self.store_erased(info.id);
            let entry = Value::Array(vec![
                Value::Dict(store.header_dict()),
                Value::Array(store.serialize_data()),
            ]);
            root.insert(info.name, entry);
        }
        root
    }

    /// Encode the full component universe into a byte buffer.
    pub fn dump_components(&mut self) -> Vec<u8> {
        dump(&self.serialize_components())
    }

    /// BLAKE3 hex digest of the encoded component universe.
    ///
    /// Two worlds with the same registration order and the same component
    /// data hash identically -- useful for determinism verification.
    pub fn state_hash(&mut self) -> String {
        blake3::hash(&self.dump_components()).to_hex().to_string()
    }

    /// Load a document by creating components, allocating entity identity as
    /// needed.
    ///
    /// Every (id, fields) pair in the document is constructed as a fresh
    /// default instance, populated via the type's deserialize callback, and
    /// inserted -- overwriting any component the entity already owns. The
    /// entity allocator's high-water mark is advanced past every id seen, so
    /// ids allocated afterwards never collide with document ids.
    ///
    /// All type names are validated *before* any state is touched; a schema
    /// error on an individual entry aborts the load with the failing entry
    /// never inserted.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownComponentType`] if the document references an
    /// unregistered type name; [`CoreError::MissingField`] /
    /// [`CoreError::TypeMismatch`] on schema disagreement;
    /// [`CoreError::ComponentDeserialization`] on structural damage.
    pub fn deserialize_components_create(&mut self, doc: &Dict) -> Result<(), CoreError> {
        self.check_known_types(doc)?;

        let World {
            allocator,
            registry,
            stores,
        } = self;

        for (name, entry) in doc.iter() {
            let template = registry
                .lookup_by_name(name)
                .expect("type names pre-validated");
            let store = stores[template.index()].as_mut();

            let (header, data) = split_entry(name, entry)?;
            store.validate_header(header)?;

            for (entity, fields) in data_pairs(name, data)? {
                store.deserialize_entry(entity, fields)?;
                allocator.advance_past(entity);
            }
        }
        Ok(())
    }

    /// Load a document by merging into existing components.
    ///
    /// Entries whose entity already owns the component get their field data
    /// overwritten; entries for entities that do not are skipped with a debug
    /// log -- merge never creates. Validation and error behavior otherwise
    /// match [`deserialize_components_create`](Self::deserialize_components_create).
    pub fn deserialize_components_merge(&mut self, doc: &Dict) -> Result<(), CoreError> {
        self.check_known_types(doc)?;

        let World {
            registry, stores, ..
        } = self;

        for (name, entry) in doc.iter() {
            let template = registry
                .lookup_by_name(name)
                .expect("type names pre-validated");
            let store = stores[template.index()].as_mut();

            let (header, data) = split_entry(name, entry)?;
            store.validate_header(header)?;

            for (entity, fields) in data_pairs(name, data)? {
                if !store.merge_entry(entity, fields)? {
                    tracing::debug!(
                        component = name,
                        entity = %entity,
                        "merge skipped entry for entity without the component"
                    );
                }
            }
        }
        Ok(())
    }

    /// Validate every top-level type name against the registry before
    /// touching any state.
    fn check_known_types(&self, doc: &Dict) -> Result<(), CoreError> {
        for name in doc.keys() {
            if self.registry.lookup_by_name(name).is_none() {
                return Err(CoreError::UnknownComponentType {
                    name: name.to_owned(),
                    registered: self.registry.names_for_error(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Document structure helpers
// ---------------------------------------------------------------------------

fn malformed(component: &str, details: String) -> CoreError {
    CoreError::ComponentDeserialization {
        component: component.to_owned(),
        details,
    }
}

/// Split a per-type document entry into its `[header, data]` parts.
fn split_entry<'a>(name: &str, entry: &'a Value) -> Result<(&'a Dict, &'a [Value]), CoreError> {
    let parts = entry.as_array().ok_or_else(|| {
        malformed(
            name,
            format!("expected [header, data] array, found {}", entry.kind_name()),
        )
    })?;
    match parts {
        [Value::Dict(header), Value::Array(data)] => Ok((header, data)),
        _ => Err(malformed(
            name,
            "entry must be a [header dict, data array] pair".to_owned(),
        )),
    }
}

/// Parse a data array's alternating `(entity id, field dict)` pairs.
fn data_pairs<'a>(
    component: &str,
    data: &'a [Value],
) -> Result<Vec<(EntityId, &'a Dict)>, CoreError> {
    if data.len() % 2 != 0 {
        return Err(malformed(
            component,
            format!("data array has odd length {}", data.len()),
        ));
    }
    let mut pairs = Vec::with_capacity(data.len() / 2);
    for chunk in data.chunks_exact(2) {
        let raw = chunk[0].as_int().ok_or_else(|| {
            malformed(
                component,
                format!("expected entity id int, found {}", chunk[0].kind_name()),
            )
        })?;
        if raw < 0 {
            return Err(malformed(component, format!("negative entity id {raw}")));
        }
        let fields = match &chunk[1] {
            Value::Dict(fields) => fields,
            other => {
                return Err(malformed(
                    component,
                    format!(
                        "expected field dict for entity {raw}, found {}",
                        other.kind_name()
                    ),
                ))
            }
        };
        pairs.push((EntityId::from_raw(raw as u64), fields));
    }
    Ok(pairs)
}
