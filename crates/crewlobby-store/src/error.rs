//! Error types for the persistence layer.

/// Which table a [`StoreError`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Lobby,
    Player,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby => f.write_str("lobby"),
            Self::Player => f.write_str("player"),
        }
    }
}

/// Errors reported by a [`Store`](crate::Store) or its transactions.
///
/// Adapters translate their backend's failures into these variants so the
/// lifecycle layer can react to the ones it cares about (unique and
/// foreign-key violations) without knowing which database is underneath.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A row with this primary key already exists.
    #[error("{entity} {id} already exists")]
    AlreadyExists { entity: Entity, id: String },

    /// The row to update does not exist.
    #[error("{entity} {id} does not exist")]
    Missing { entity: Entity, id: String },

    /// A write would break a reference between tables, e.g. a player in a
    /// lobby that does not exist or a lobby deleted while it still has
    /// members.
    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    /// Commit was rejected; nothing from the transaction was applied.
    #[error("commit failed: {0}")]
    CommitFailed(String),

    /// Any other backend failure (connection lost, timeout, ...).
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether this error is a primary-key collision.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}
