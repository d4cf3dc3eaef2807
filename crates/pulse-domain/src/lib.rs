//! pulse-domain: neutral data model for the pulse graph.
//!
//! Purpose:
//! - Provide the node/wire/type shapes the rest of the workspace builds on,
//!   without any scheduling or dispatch semantics attached.
//! - Define the persisted graph-file schema (`graph`) and the soft-cast
//!   combinators (`types`) used when a value crosses a typed port boundary.
//!
//! Components:
//! - `node`: `Node`, `NodeFlags`, the property bag.
//! - `wire`: `Wire`, the flow/data edge between two ports.
//! - `types`: `DataType` tag and `Value`, plus `Value::soft_cast`.
//! - `graph`: `GraphDocument` / `NodeDef` / `WireDef`, the on-disk schema.
//! - `error`: `DomainError`.

pub mod error;
pub mod graph;
pub mod node;
pub mod types;
pub mod wire;

pub use error::DomainError;
pub use graph::{GraphDocument, NodeDef, WireDef};
pub use node::{Node, NodeFlags};
pub use types::{DataType, Value};
pub use wire::Wire;
