// Schema loading: turns a protocol document into an immutable table of
// ready-to-use type handlers.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use serde_json::Value as Json;
use tracing::debug;

use crate::cursor::ByteCursor;
use crate::error::{DecodeError, SchemaError};
use crate::handler::{HandlerKind, HandlerRef, TypeHandler};
use crate::ident::ResourceLocation;
use crate::params::TypeParams;
use crate::record::PacketRecord;
use crate::types::conditional::{OptionType, SwitchType};
use crate::types::numeric::{NumericKind, NumericType};
use crate::types::primitive::{BoolType, VoidType};
use crate::types::structure::{ArrayType, ContainerType};
use crate::types::util::{BitfieldType, BufferType, MapperType, PstringType};
use crate::types::xtended::{
    ArrayWithLengthOffsetType, EntityMetadataLoopType, NbtType, RestBufferType,
    TopBitSetTerminatedArrayType, UuidType,
};
use crate::value::Value;

type JsonMap = serde_json::Map<String, Json>;

/// A registered type: either a usable handler or a bare parameterized
/// native family, which only ever serves as the underlying type of a
/// parameterized definition.
enum Slot {
    Template,
    Ready(HandlerRef),
}

fn scoped_id(scope: &str, path: &str) -> ResourceLocation {
    if scope.is_empty() {
        ResourceLocation::global(path)
    } else {
        ResourceLocation::new(scope, path)
    }
}

/// Family of a bare native template, by name.
fn template_kind(id: &ResourceLocation) -> Result<HandlerKind, SchemaError> {
    Ok(match id.path() {
        "switch" => HandlerKind::Switch,
        "option" => HandlerKind::Option,
        "array" => HandlerKind::Array,
        "arrayWithLengthOffset" => HandlerKind::ArrayWithLengthOffset,
        "container" => HandlerKind::Container,
        "bitfield" => HandlerKind::Bitfield,
        "buffer" => HandlerKind::Buffer,
        "mapper" => HandlerKind::Mapper,
        "pstring" => HandlerKind::Pstring,
        "entityMetadataLoop" => HandlerKind::EntityMetadataLoop,
        "topBitSetTerminatedArray" => HandlerKind::TopBitSetTerminatedArray,
        _ => return Err(SchemaError::UnknownType(id.to_string())),
    })
}

fn seed_natives(table: &mut HashMap<ResourceLocation, Slot>) {
    use NumericKind::*;

    let numerics: &[(&str, NumericKind)] = &[
        ("i8", I8),
        ("u8", U8),
        ("i16", I16),
        ("u16", U16),
        ("i32", I32),
        ("u32", U32),
        ("i64", I64),
        ("u64", U64),
        ("f32", F32),
        ("f64", F64),
        ("varint", VarInt),
        ("varlong", VarLong),
    ];
    for (name, kind) in numerics {
        let id = ResourceLocation::global(*name);
        table.insert(
            id.clone(),
            Slot::Ready(Arc::new(NumericType::new(id.clone(), *kind))),
        );
    }

    let bool_id = ResourceLocation::global("bool");
    table.insert(
        bool_id.clone(),
        Slot::Ready(Arc::new(BoolType::new(bool_id.clone()))),
    );
    let void_id = ResourceLocation::global("void");
    table.insert(
        void_id.clone(),
        Slot::Ready(Arc::new(VoidType::new(void_id.clone()))),
    );
    let uuid_id = ResourceLocation::global("UUID");
    table.insert(
        uuid_id.clone(),
        Slot::Ready(Arc::new(UuidType::new(uuid_id.clone()))),
    );
    let rest_id = ResourceLocation::global("restBuffer");
    table.insert(
        rest_id.clone(),
        Slot::Ready(Arc::new(RestBufferType::new(rest_id.clone()))),
    );

    // nbt and optionalNbt expect a named compound root; the anonymous pair
    // is the post-1.20.2 network form.
    let nbt_variants: &[(&str, bool)] = &[
        ("nbt", false),
        ("optionalNbt", false),
        ("anonymousNbt", true),
        ("anonOptionalNbt", true),
    ];
    for (name, anonymous_root) in nbt_variants {
        let id = ResourceLocation::global(*name);
        table.insert(
            id.clone(),
            Slot::Ready(Arc::new(NbtType::new(id.clone(), *anonymous_root))),
        );
    }

    let templates = [
        "switch",
        "option",
        "array",
        "arrayWithLengthOffset",
        "container",
        "bitfield",
        "buffer",
        "mapper",
        "pstring",
        "entityMetadataLoop",
        "topBitSetTerminatedArray",
    ];
    for name in templates {
        table.insert(ResourceLocation::global(name), Slot::Template);
    }
}

/// Late-bound reference to a type that was still under construction when a
/// sibling needed it. Bound once the whole document is loaded; recursive
/// type definitions work because decode-time lookups go through here.
pub struct ProxyHandler {
    id: ResourceLocation,
    target: OnceLock<HandlerRef>,
}

impl ProxyHandler {
    fn new(id: ResourceLocation) -> Self {
        ProxyHandler {
            id,
            target: OnceLock::new(),
        }
    }

    fn bind(&self, handler: HandlerRef) {
        let _ = self.target.set(handler);
    }
}

impl TypeHandler for ProxyHandler {
    fn type_id(&self) -> &ResourceLocation {
        &self.id
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Proxy
    }

    fn read_typed(
        &self,
        record: &mut PacketRecord,
        path: &str,
        cursor: &mut ByteCursor,
    ) -> Result<Value, DecodeError> {
        self.target
            .get()
            .ok_or_else(|| DecodeError::UnboundProxy(self.id.clone()))?
            .read_value(record, path, cursor)
    }
}

/// Accumulates type definitions from one or more protocol documents, then
/// freezes into a [`TypeRegistry`].
pub struct RegistryBuilder {
    loaded: HashMap<ResourceLocation, Slot>,
    building: HashSet<ResourceLocation>,
    proxies: Vec<Arc<ProxyHandler>>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        let mut loaded = HashMap::new();
        seed_natives(&mut loaded);
        RegistryBuilder {
            loaded,
            building: HashSet::new(),
            proxies: Vec::new(),
        }
    }

    /// Walk a protocol document, registering every `types` dictionary under
    /// its namespace path. Nested objects become nested namespaces
    /// (`play/toClient` and so on).
    pub fn register_protocol(&mut self, document: &Json) -> Result<(), SchemaError> {
        self.register_namespace("", document)
    }

    fn register_namespace(&mut self, scope: &str, node: &Json) -> Result<(), SchemaError> {
        let Some(obj) = node.as_object() else {
            return Ok(());
        };

        // Register this level's own types before descending: child
        // namespaces may reference them by bare name.
        if let Some(dict) = obj.get("types").and_then(Json::as_object) {
            self.register_types(scope, dict)?;
        }
        for (key, value) in obj {
            if key != "types" && value.is_object() {
                let child = if scope.is_empty() {
                    key.clone()
                } else {
                    format!("{scope}/{key}")
                };
                self.register_namespace(&child, value)?;
            }
        }
        Ok(())
    }

    fn register_types(&mut self, scope: &str, dict: &JsonMap) -> Result<(), SchemaError> {
        for name in dict.keys() {
            if self.loaded.contains_key(&scoped_id(scope, name)) {
                continue;
            }
            self.load_named(scope, name, dict)?;
        }
        Ok(())
    }

    /// Load the named definition from `dict`, registering the handler under
    /// its scoped id.
    fn load_named(
        &mut self,
        scope: &str,
        name: &str,
        dict: &JsonMap,
    ) -> Result<HandlerRef, SchemaError> {
        let id = scoped_id(scope, name);
        if let Some(Slot::Ready(handler)) = self.loaded.get(&id) {
            return Ok(handler.clone());
        }
        // A dependency cycle through underlying types can never terminate;
        // cycles through element or case types go through a proxy instead.
        if !self.building.insert(id.clone()) {
            return Err(SchemaError::CyclicType(id));
        }

        let result = self.load_named_inner(scope, &id, name, dict);
        self.building.remove(&id);

        let handler = result?;
        debug!(type_id = %id, "registered type");
        self.loaded.insert(id, Slot::Ready(handler.clone()));
        Ok(handler)
    }

    fn load_named_inner(
        &mut self,
        scope: &str,
        id: &ResourceLocation,
        name: &str,
        dict: &JsonMap,
    ) -> Result<HandlerRef, SchemaError> {
        let def = dict
            .get(name)
            .ok_or_else(|| SchemaError::UnknownType(id.to_string()))?;
        let (underlying, params) = self.parse_def(scope, def, dict)?;
        self.build_def_handler(scope, id, &underlying, params, dict)
    }

    /// Split a type token into its underlying type id and optional
    /// parameters. Tokens are either a plain name or a `[name, params]`
    /// pair.
    fn parse_def<'j>(
        &self,
        scope: &str,
        token: &'j Json,
        dict: &JsonMap,
    ) -> Result<(ResourceLocation, Option<&'j Json>), SchemaError> {
        match token {
            Json::String(name) => Ok((self.get_type_id(scope, name, dict)?, None)),
            Json::Array(parts) => {
                let name = parts
                    .first()
                    .and_then(Json::as_str)
                    .ok_or_else(|| SchemaError::UnknownType(token.to_string()))?;
                Ok((self.get_type_id(scope, name, dict)?, parts.get(1)))
            }
            _ => Err(SchemaError::UnknownType(token.to_string())),
        }
    }

    /// Resolve a bare type name to an id: the local dictionary wins, then
    /// already-registered types in enclosing namespaces out to the root
    /// (where the natives live).
    fn get_type_id(
        &self,
        scope: &str,
        path: &str,
        dict: &JsonMap,
    ) -> Result<ResourceLocation, SchemaError> {
        if dict.contains_key(path) {
            return Ok(scoped_id(scope, path));
        }
        let mut current = scope;
        loop {
            let id = scoped_id(current, path);
            if self.loaded.contains_key(&id) {
                return Ok(id);
            }
            if current.is_empty() {
                return Err(SchemaError::UnknownType(path.to_string()));
            }
            current = match current.rfind('/') {
                Some(split) => &current[..split],
                None => "",
            };
        }
    }

    /// Build a handler for a child type token: a bare name resolves through
    /// the registry (deferring through a proxy if the target is still being
    /// built), a parameterized token builds inline.
    fn build_item(
        &mut self,
        scope: &str,
        token: &Json,
        dict: &JsonMap,
    ) -> Result<HandlerRef, SchemaError> {
        let (item_id, item_params) = self.parse_def(scope, token, dict)?;

        if let Some(params) = item_params {
            return self.build_def_handler(scope, &item_id, &item_id, Some(params), dict);
        }

        match self.loaded.get(&item_id) {
            Some(Slot::Ready(handler)) => return Ok(handler.clone()),
            Some(Slot::Template) => return Err(SchemaError::BareTemplate(item_id)),
            None => {}
        }
        if self.building.contains(&item_id) {
            let proxy = Arc::new(ProxyHandler::new(item_id.clone()));
            self.proxies.push(proxy.clone());
            return Ok(proxy);
        }
        if item_id == scoped_id(scope, item_id.path()) && dict.contains_key(item_id.path()) {
            return self.load_named(scope, item_id.path(), dict);
        }
        Err(SchemaError::UnknownType(item_id.to_string()))
    }

    /// Construct the handler for `custom_id`, whose definition names
    /// `underlying_id` (possibly itself, for inline definitions) with
    /// optional parameters.
    fn build_def_handler(
        &mut self,
        scope: &str,
        custom_id: &ResourceLocation,
        underlying_id: &ResourceLocation,
        params: Option<&Json>,
        dict: &JsonMap,
    ) -> Result<HandlerRef, SchemaError> {
        if !self.loaded.contains_key(underlying_id) {
            // Possibly a sibling declared later in the same dictionary.
            let local = underlying_id.path();
            if *underlying_id == scoped_id(scope, local) && dict.contains_key(local) {
                self.load_named(scope, local, dict)?;
            } else {
                return Err(SchemaError::UnknownUnderlyingType {
                    underlying: underlying_id.clone(),
                    used_by: custom_id.clone(),
                });
            }
        }

        let underlying = match self.loaded.get(underlying_id) {
            Some(Slot::Ready(handler)) => Some(handler.clone()),
            _ => None,
        };

        // No parameters: a plain alias for whatever the underlying type is.
        let Some(params) = params else {
            return match underlying {
                Some(handler) => Ok(handler),
                None => Err(SchemaError::BareTemplate(underlying_id.clone())),
            };
        };

        let kind = match &underlying {
            Some(handler) => handler.kind(),
            None => template_kind(underlying_id)?,
        };
        let template_params: Option<TypeParams> =
            underlying.as_ref().and_then(|h| h.params().cloned());

        let supplied_map = |params: &Json| -> Result<JsonMap, SchemaError> {
            params
                .as_object()
                .cloned()
                .ok_or_else(|| SchemaError::Malformed {
                    type_id: custom_id.clone(),
                    detail: format!("parameters must be an object, got {params}"),
                })
        };
        let supplied_list = |params: &Json| -> Result<Vec<Json>, SchemaError> {
            params
                .as_array()
                .cloned()
                .ok_or_else(|| SchemaError::Malformed {
                    type_id: custom_id.clone(),
                    detail: format!("parameters must be a list, got {params}"),
                })
        };

        let mut build = |token: &Json| self.build_item(scope, token, dict);
        let handler: HandlerRef = match kind {
            HandlerKind::Switch => Arc::new(SwitchType::new(
                custom_id.clone(),
                &supplied_map(params)?,
                template_params.as_ref(),
                &mut build,
            )?),
            HandlerKind::Array => Arc::new(ArrayType::new(
                custom_id.clone(),
                &supplied_map(params)?,
                template_params.as_ref(),
                &mut build,
            )?),
            HandlerKind::ArrayWithLengthOffset => Arc::new(ArrayWithLengthOffsetType::new(
                custom_id.clone(),
                &supplied_map(params)?,
                template_params.as_ref(),
                &mut build,
            )?),
            HandlerKind::Buffer => Arc::new(BufferType::new(
                custom_id.clone(),
                &supplied_map(params)?,
                template_params.as_ref(),
                &mut build,
            )?),
            HandlerKind::Mapper => Arc::new(MapperType::new(
                custom_id.clone(),
                &supplied_map(params)?,
                template_params.as_ref(),
                &mut build,
            )?),
            HandlerKind::Pstring => Arc::new(PstringType::new(
                custom_id.clone(),
                &supplied_map(params)?,
                template_params.as_ref(),
                &mut build,
            )?),
            HandlerKind::EntityMetadataLoop => Arc::new(EntityMetadataLoopType::new(
                custom_id.clone(),
                &supplied_map(params)?,
                template_params.as_ref(),
                &mut build,
            )?),
            HandlerKind::TopBitSetTerminatedArray => Arc::new(TopBitSetTerminatedArrayType::new(
                custom_id.clone(),
                &supplied_map(params)?,
                template_params.as_ref(),
                &mut build,
            )?),
            HandlerKind::Option => {
                Arc::new(OptionType::new(custom_id.clone(), params, &mut build)?)
            }
            HandlerKind::Container => Arc::new(ContainerType::new(
                custom_id.clone(),
                &supplied_list(params)?,
                &mut build,
            )?),
            HandlerKind::Bitfield => {
                Arc::new(BitfieldType::new(custom_id.clone(), &supplied_list(params)?)?)
            }
            _ => {
                return Err(SchemaError::Malformed {
                    type_id: custom_id.clone(),
                    detail: format!("{underlying_id} does not take parameters"),
                })
            }
        };
        Ok(handler)
    }

    /// Freeze into an immutable registry, binding every deferred reference.
    /// Fails if a proxy's target was never actually defined.
    pub fn build(self) -> Result<TypeRegistry, SchemaError> {
        let mut handlers: HashMap<ResourceLocation, HandlerRef> = HashMap::new();
        for (id, slot) in &self.loaded {
            if let Slot::Ready(handler) = slot {
                handlers.insert(id.clone(), handler.clone());
            }
        }
        for proxy in &self.proxies {
            let target =
                handlers
                    .get(&proxy.id)
                    .ok_or_else(|| SchemaError::UnknownType(proxy.id.to_string()))?;
            proxy.bind(target.clone());
        }
        Ok(TypeRegistry { handlers })
    }
}

/// Immutable handler table. Shareable across threads; all mutability ends
/// at build time.
pub struct TypeRegistry {
    handlers: HashMap<ResourceLocation, HandlerRef>,
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TypeRegistry {
    /// Load a registry from a single protocol document.
    pub fn from_protocol(document: &Json) -> Result<Self, SchemaError> {
        let mut builder = RegistryBuilder::new();
        builder.register_protocol(document)?;
        builder.build()
    }

    pub fn get(&self, id: &ResourceLocation) -> Option<HandlerRef> {
        self.handlers.get(id).cloned()
    }

    pub fn handler(&self, id: &ResourceLocation) -> Result<HandlerRef, SchemaError> {
        self.get(id)
            .ok_or_else(|| SchemaError::UnknownType(id.to_string()))
    }

    pub fn type_ids(&self) -> impl Iterator<Item = &ResourceLocation> {
        self.handlers.keys()
    }
}

/// Decode one full packet body as the given type, starting from an empty
/// record at the root path.
pub fn decode_packet(
    handler: &HandlerRef,
    data: impl Into<bytes::Bytes>,
) -> Result<Value, DecodeError> {
    let mut record = PacketRecord::new();
    let mut cursor = ByteCursor::new(data);
    handler.read_value(&mut record, "", &mut cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde_json::json;

    fn registry(document: Json) -> TypeRegistry {
        TypeRegistry::from_protocol(&document).unwrap()
    }

    fn decode(reg: &TypeRegistry, id: ResourceLocation, bytes: &[u8]) -> Value {
        let handler = reg.handler(&id).unwrap();
        decode_packet(&handler, Bytes::copy_from_slice(bytes)).unwrap()
    }

    #[test]
    fn natives_are_preregistered() {
        let reg = registry(json!({}));
        assert!(reg.get(&ResourceLocation::global("varint")).is_some());
        assert!(reg.get(&ResourceLocation::global("UUID")).is_some());
        // bare templates are not usable handlers
        assert!(reg.get(&ResourceLocation::global("switch")).is_none());
    }

    #[test]
    fn alias_resolves_to_underlying_handler() {
        let reg = registry(json!({"types": {"entity_id": "varint"}}));
        let value = decode(&reg, ResourceLocation::global("entity_id"), &[0xac, 0x02]);
        assert_eq!(value, Value::I32(300));
    }

    #[test]
    fn alias_to_bare_template_is_rejected() {
        let err = TypeRegistry::from_protocol(&json!({"types": {"bad": "switch"}})).unwrap_err();
        assert!(matches!(err, SchemaError::BareTemplate(_)));
    }

    #[test]
    fn container_with_inline_array() {
        let reg = registry(json!({"types": {
            "packet": ["container", [
                {"name": "id", "type": "u8"},
                {"name": "payload", "type": ["array", {"countType": "varint", "type": "u16"}]},
            ]],
        }}));
        let value = decode(
            &reg,
            ResourceLocation::global("packet"),
            &[0x07, 0x02, 0x00, 0x01, 0x00, 0x02],
        );
        assert_eq!(
            value,
            Value::Map(vec![
                ("id".into(), Value::U8(7)),
                (
                    "payload".into(),
                    Value::Array(vec![Value::U16(1), Value::U16(2)]),
                ),
            ])
        );
    }

    #[test]
    fn switch_references_sibling_field() {
        let reg = registry(json!({"types": {
            "packet": ["container", [
                {"name": "kind", "type": "u8"},
                {"name": "body", "type": ["switch", {
                    "compareTo": "kind",
                    "fields": {"1": "u8", "2": "u16"},
                }]},
            ]],
        }}));
        let value = decode(&reg, ResourceLocation::global("packet"), &[0x02, 0x01, 0x02]);
        assert_eq!(
            value,
            Value::Map(vec![
                ("kind".into(), Value::U8(2)),
                ("body".into(), Value::U16(0x0102)),
            ])
        );
    }

    #[test]
    fn template_chain_resolves_through_namespaces() {
        let reg = registry(json!({"types": {
            "counted": ["array", {"countType": "$cType", "type": "u8"}],
            "byte_list": ["counted", {"cType": "u8"}],
        }}));
        let value = decode(
            &reg,
            ResourceLocation::global("byte_list"),
            &[0x02, 0xaa, 0xbb],
        );
        assert_eq!(value, Value::Array(vec![Value::U8(0xaa), Value::U8(0xbb)]));

        // the intermediate template itself stays unusable
        let template = reg.handler(&ResourceLocation::global("counted")).unwrap();
        let err = decode_packet(&template, Bytes::from_static(&[0x01, 0x02])).unwrap_err();
        assert!(matches!(err, DecodeError::UnresolvedParameters { .. }));
    }

    #[test]
    fn nested_namespaces_see_parent_types() {
        let reg = registry(json!({
            "types": {"string": ["pstring", {"countType": "varint"}]},
            "play": {"toClient": {"types": {
                "chat": ["container", [{"name": "message", "type": "string"}]],
            }}},
        }));
        let value = decode(
            &reg,
            ResourceLocation::new("play/toClient", "chat"),
            &[0x02, b'h', b'i'],
        );
        assert_eq!(
            value,
            Value::Map(vec![("message".into(), Value::Str("hi".into()))])
        );
    }

    #[test]
    fn local_type_shadows_parent_type() {
        let reg = registry(json!({
            "types": {"ident": "u8"},
            "play": {"types": {
                "ident": "u16",
                "packet": ["container", [{"name": "id", "type": "ident"}]],
            }},
        }));
        let value = decode(
            &reg,
            ResourceLocation::new("play", "packet"),
            &[0x01, 0x02],
        );
        assert_eq!(value, Value::Map(vec![("id".into(), Value::U16(0x0102))]));
    }

    #[test]
    fn recursive_type_binds_through_proxy() {
        // A tree node: a tag byte, then zero or more children of itself.
        let reg = registry(json!({"types": {
            "node": ["container", [
                {"name": "tag", "type": "u8"},
                {"name": "children", "type": ["array", {"countType": "u8", "type": "node"}]},
            ]],
        }}));
        let value = decode(
            &reg,
            ResourceLocation::global("node"),
            &[0x01, 0x01, 0x02, 0x00],
        );
        assert_eq!(
            value,
            Value::Map(vec![
                ("tag".into(), Value::U8(1)),
                (
                    "children".into(),
                    Value::Array(vec![Value::Map(vec![
                        ("tag".into(), Value::U8(2)),
                        ("children".into(), Value::Array(vec![])),
                    ])]),
                ),
            ])
        );
    }

    #[test]
    fn cyclic_alias_is_rejected() {
        let err = TypeRegistry::from_protocol(&json!({"types": {
            "a": "b",
            "b": "a",
        }}))
        .unwrap_err();
        assert!(matches!(err, SchemaError::CyclicType(_)));
    }

    #[test]
    fn unknown_type_reference_is_rejected() {
        let err = TypeRegistry::from_protocol(&json!({"types": {
            "packet": ["container", [{"name": "x", "type": "no_such_type"}]],
        }}))
        .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType(_)));
    }
}
