// Library module declarations
pub mod cursor;
pub mod error;
pub mod handler;
pub mod ident;
pub mod nbt;
pub mod params;
pub mod record;
pub mod registry;
pub mod types;
pub mod value;

pub use cursor::ByteCursor;
pub use error::{DecodeError, SchemaError};
pub use handler::{HandlerKind, HandlerRef, TypeHandler};
pub use ident::ResourceLocation;
pub use record::PacketRecord;
pub use registry::{decode_packet, RegistryBuilder, TypeRegistry};
pub use value::Value;
