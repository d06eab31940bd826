//! Errors specific to the MongoDB room store.

use mongodb::error::Error as MongoError;
use thiserror::Error;

/// Result alias for MongoDB store operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failure cases surfaced by the MongoDB backend.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// Connection URI could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// The offending URI.
        uri: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Client could not be constructed from the parsed options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Initial ping never succeeded.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Driver error from the last attempt.
        #[source]
        source: MongoError,
    },
    /// Health-check ping failed on an established connection.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// TTL index creation failed.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection the index belongs to.
        collection: &'static str,
        /// Index name.
        index: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Upsert of a room record failed.
    #[error("failed to save room `{room_code}`")]
    SaveRoom {
        /// Room code of the record.
        room_code: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Lookup of a room record failed.
    #[error("failed to load room `{room_code}`")]
    LoadRoom {
        /// Room code of the record.
        room_code: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
}
