pub mod disambiguation;
pub mod find;
pub mod hierarchy;
pub mod path;

pub use disambiguation::{DisambiguatedCandidate, DisambiguationCollision, DisambiguationTree};
pub use find::{CollisionCandidate, PathLookupError};
pub use hierarchy::{
    MergeConflict, MergeConflictDetail, NodeId, PathHierarchy, PathNode, PathNodeRole,
    SymbolPayload,
};
pub use path::{parse_path, to_anchor, ParsedPath, PathComponent, PathPrefix};
