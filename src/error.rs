// Error types, split along the load-time / decode-time boundary.

use thiserror::Error;

use crate::ident::ResourceLocation;

/// Errors raised while loading a protocol document and constructing type
/// handlers. These are unrecoverable configuration problems: the offending
/// type (or the whole document) is rejected.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("type {0} is defined in neither local nor parent namespaces, and is not a native type")]
    UnknownType(String),

    #[error("underlying type {underlying} (used by {used_by}) is not loaded and not declared")]
    UnknownUnderlyingType {
        underlying: ResourceLocation,
        used_by: ResourceLocation,
    },

    #[error("cyclic type definition involving {0}")]
    CyclicType(ResourceLocation),

    #[error("container entry in {type_id} must have a non-empty name unless marked anonymous")]
    UnnamedContainerEntry { type_id: ResourceLocation },

    #[error("bitfield {type_id} spans {total_bits} bits, which is not a positive multiple of 8")]
    MisalignedBitfield {
        type_id: ResourceLocation,
        total_bits: u32,
    },

    #[error("{type_id} must configure exactly one of its sizing parameters ({detail})")]
    AmbiguousCount {
        type_id: ResourceLocation,
        detail: &'static str,
    },

    #[error("malformed definition for {type_id}: {detail}")]
    Malformed {
        type_id: ResourceLocation,
        detail: String,
    },

    #[error("handler for {0} is a bare template and cannot be used directly")]
    BareTemplate(ResourceLocation),
}

/// Errors raised while decoding one packet. Any of these aborts the current
/// decode; no partial result is usable. Malformed input fails the same way
/// every time, so there is nothing to retry.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("need {needed} byte(s) but only {remaining} remain in the packet")]
    InsufficientData { needed: usize, remaining: usize },

    #[error("varint is longer than 5 bytes")]
    VarIntTooBig,

    #[error("varlong is longer than 10 bytes")]
    VarLongTooBig,

    #[error("field {field:?} referenced from {path:?} was not decoded before it was needed")]
    MissingReferenceField { path: String, field: String },

    #[error("field {field:?} at {path:?} holds {found}, which cannot be used as a count")]
    NonNumericReference {
        path: String,
        field: String,
        found: &'static str,
    },

    #[error("resolved element count {0} is out of range")]
    BadCount(i64),

    #[error("type {type_id} still has unresolved parameters: {names:?}")]
    UnresolvedParameters {
        type_id: ResourceLocation,
        names: Vec<String>,
    },

    #[error("nbt blob does not start with a compound tag (found tag {0})")]
    BadNbtRoot(u8),

    #[error("unknown nbt tag {0}")]
    UnknownNbtTag(u8),

    #[error("proxy for type {0} was never bound to a handler")]
    UnboundProxy(ResourceLocation),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = DecodeError::MissingReferenceField {
            path: "packet/params".into(),
            field: "count".into(),
        };
        assert!(err.to_string().contains("count"));
        assert!(err.to_string().contains("packet/params"));

        let err = SchemaError::MisalignedBitfield {
            type_id: ResourceLocation::global("position"),
            total_bits: 26,
        };
        assert!(err.to_string().contains("26"));
    }
}
