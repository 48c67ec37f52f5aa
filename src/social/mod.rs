pub mod graph;
pub mod interaction;

pub use graph::{EdgeKey, InteractionRecord, Relationship, RelationshipKind, SocialGraph};
