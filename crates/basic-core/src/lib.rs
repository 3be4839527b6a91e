//! # basic-core — Runtime Schema Engine
//!
//! Composable type descriptors, schema-validated records, and lossless
//! conversion of native values to and from two wire targets: a JSON-like
//! tree (text-safe) and a BSON-like tree (raw bytes and timestamps kept).
//!
//! ## Key Design Principles
//!
//! 1. **Descriptors are values.** A [`Descriptor`] is an immutable shape
//!    plus a [`DefaultPolicy`]. Attaching a default or binding template
//!    parameters returns a new descriptor.
//!
//! 2. **One traversal.** [`Descriptor::apply`] walks a value alongside its
//!    descriptor bottom-up. Validation and class reconstruction
//!    ([`convert`]) are built on it.
//!
//! 3. **Null passes through.** `Value::Null` crosses every conversion
//!    unchanged and never reaches descriptor-specific logic.
//!
//! 4. **Static reflection.** Class-backed records are derived from an
//!    explicit [`Signature`] rather than runtime introspection; a Rust type
//!    opts in by implementing [`Reflect`].
//!
//! 5. **Recursive schemas through one-shot cells.** A [`Placeholder`] is
//!    bound exactly once, after every schema that mentions it exists.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `.unwrap()` outside tests. The one deliberate panic is resolving a
//!   placeholder twice.
//! - The library logs through `tracing` and installs no subscriber.
//!
//! ## Example
//!
//! ```
//! use basic_core::{types::{INT, STR}, StructType, Value};
//!
//! let person = StructType::named("Person")
//!     .field("name", STR)
//!     .field("age", INT.with_default(0))
//!     .build();
//! let bo = person.new_record([("name", Value::from("Bo"))]).unwrap();
//! assert_eq!(bo.get("age").unwrap(), &Value::Int(0));
//!
//! let json = person.to_json(&Value::Record(bo)).unwrap();
//! assert_eq!(json, serde_json::json!({"name": "Bo", "age": 0}));
//! ```

pub mod b85;
pub mod class;
pub mod dotted;
pub mod error;
pub mod inspect;
mod json;
pub mod placeholder;
pub mod policy;
pub mod record;
pub mod types;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use class::{CallArgs, Callable, ClassType, Override, ParamKind, Parameter, Reflect, Signature};
pub use dotted::{flatten, set_path, unflatten};
pub use error::SchemaError;
pub use inspect::{convert, descriptor_for, guess_anonymous, guess_struct, guess_type, Guess};
pub use placeholder::Placeholder;
pub use policy::{DefaultPolicy, Target};
pub use record::{Record, StructBuilder, StructType};
pub use types::{Container, Descriptor, Leaf, LeafCodec};
pub use value::{DefaultMap, EnumType, EnumValue, Opaque, Value, ValueMap};
