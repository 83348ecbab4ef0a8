pub mod emitter;
pub mod error;
pub mod id;
pub mod layout;
pub mod model;
pub mod parser;
pub mod schema;
pub mod template;
pub mod tree;

pub use emitter::{emit_document, emit_node, emit_template};
pub use error::{EditError, ImportError};
pub use id::NodeId;
pub use layout::{Geometry, LayoutCache, reflow};
pub use model::*;
pub use parser::{decode, decode_list, parse_message};
pub use schema::{Color, NodeKind, Param, Registry, TypeDescriptor, ValueDomain};
pub use template::{Template, TemplateRef, Tray, equivalent};

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::graph::NodeIndex;
