//! Schema snapshots

mod builder;
mod snapshot;

pub use builder::SnapshotBuilder;
pub use snapshot::{
    ColumnMetadata, IndexMetadata, QualifiedName, SchemaMetadata, SchemaSnapshot, TableMetadata,
};
