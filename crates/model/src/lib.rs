//! Maven descriptor model: extraction, project trees and property resolution.

pub mod dependency;
pub mod document;
pub mod error;
pub mod extractor;
pub mod pom;
pub mod resolve;
pub mod tree;

pub use dependency::{is_dynamic_version, Dependency};
pub use error::{ExtractError, TreeError};
pub use extractor::{Extraction, PomExtractor};
pub use pom::Pom;
pub use tree::{AmbiguousParent, DegradedPom, ModuleDependencies, NodeId, PomNode, PomTree, PomTreeBuilder};
