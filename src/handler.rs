// The polymorphic type-handler capability every native type implements.

use std::sync::Arc;

use serde_json::Value as Json;

use crate::cursor::ByteCursor;
use crate::error::{DecodeError, SchemaError};
use crate::ident::ResourceLocation;
use crate::params::TypeParams;
use crate::record::PacketRecord;
use crate::value::Value;

/// Shared, immutable handler reference. Composite handlers own their
/// children through this; the tree is built once at schema load and read
/// concurrently afterwards.
pub type HandlerRef = Arc<dyn TypeHandler>;

/// Callback used during construction to build a child handler from a nested
/// JSON type description. The indirection exists because a child may be an
/// inline anonymous definition or a named, registry-resolvable type.
pub type BuildItemFn<'a> = dyn FnMut(&Json) -> Result<HandlerRef, SchemaError> + 'a;

/// Which native family a handler belongs to. Parameter-overridable families
/// use this to recognize that an underlying custom type is a template of
/// their own kind (so its parameters can be inherited).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Switch,
    Option,
    Array,
    ArrayWithLengthOffset,
    Container,
    Bitfield,
    Buffer,
    Mapper,
    Pstring,
    EntityMetadataLoop,
    TopBitSetTerminatedArray,
    Numeric,
    Primitive,
    Uuid,
    Nbt,
    RestBuffer,
    Proxy,
}

/// A constructed type handler: reads one value of its logical type off the
/// cursor, recording decoded fields into the packet record as it goes.
///
/// Handlers are built once at schema load and are stateless across reads;
/// all configuration is resolved at construction. `read_value` is the entry
/// point: it performs the unresolved-template fail-fast common to every
/// type, then delegates to the per-type `read_typed`.
pub trait TypeHandler: Send + Sync {
    fn type_id(&self) -> &ResourceLocation;

    fn kind(&self) -> HandlerKind;

    /// Construction parameters, for parameterized families only. A handler
    /// whose parameters are not fully resolved is an inert template.
    fn params(&self) -> Option<&TypeParams> {
        None
    }

    /// Per-type decode logic. Only called through `read_value`.
    fn read_typed(
        &self,
        record: &mut PacketRecord,
        path: &str,
        cursor: &mut ByteCursor,
    ) -> Result<Value, DecodeError>;

    /// Decode one value, failing fast if this handler is an unresolved
    /// template (invoking one is a schema or programming error, never a
    /// property of the input bytes).
    fn read_value(
        &self,
        record: &mut PacketRecord,
        path: &str,
        cursor: &mut ByteCursor,
    ) -> Result<Value, DecodeError> {
        if let Some(params) = self.params() {
            if !params.is_fully_resolved() {
                return Err(DecodeError::UnresolvedParameters {
                    type_id: self.type_id().clone(),
                    names: params.unresolved_names(),
                });
            }
        }
        self.read_typed(record, path, cursor)
    }
}
