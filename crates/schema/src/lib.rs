//! Tool schemas and call arguments for resolved RPC method signatures.
//!
//! - [`SchemaSynthesizer`] turns a [`ResolvedSignature`](zkmcp_metadata::ResolvedSignature)
//!   into a JSON-Schema input object and a [`ToolDefinition`].
//! - [`ParameterConverter`] turns tool-call JSON back into typed call
//!   arguments without ever failing the call.
//!
//! ```rust
//! use serde_json::json;
//! use zkmcp_metadata::{ParameterDescriptor, ResolvedSignature, SignatureSource};
//! use zkmcp_schema::{ArgValue, ParameterConverter, SchemaSynthesizer};
//!
//! let sig = ResolvedSignature::new(
//!     "com.example.UserService",
//!     "getUserById",
//!     vec![ParameterDescriptor::new("userId", "java.lang.Long", 0)],
//!     SignatureSource::Heuristic,
//! );
//!
//! let schema = SchemaSynthesizer::new(None).build_input_schema(&sig);
//! assert_eq!(schema["properties"]["userId"]["format"], "int64");
//!
//! let args = json!({"userId": "42"});
//! let converted = ParameterConverter::new(None).convert(args.as_object().unwrap(), &sig);
//! assert_eq!(converted.values, vec![ArgValue::Long(42)]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod convert;
pub mod describe;
pub mod synth;
pub mod tool;
mod value;

pub use convert::{ConversionIssue, ConvertedArguments, ParameterConverter, LEGACY_ARGS_KEY};
pub use describe::{describe_method, describe_parameter, friendly_label};
pub use synth::{SchemaOptions, SchemaSynthesizer};
pub use tool::{legacy_args_schema, legacy_tool, split_tool_name, ToolDefinition};
pub use value::ArgValue;
