//! CodeAtlas: parses source repositories into a queryable code knowledge
//! graph (symbols, AST nodes, dependency edges, embeddings) backed by
//! PostgreSQL + pgvector.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
#[cfg(feature = "http-server")]
pub mod http;
pub mod indexing;
pub mod io;
pub mod logging;
pub mod mapper;
pub mod parsing;
pub mod query;
pub mod scan;
pub mod store;
pub mod types;

pub use error::{CoreError, ErrorCollector, ErrorKind};
pub use indexing::{IndexResult, IndexStatus, Indexer, Options as IndexOptions, RepositoryRef};
pub use mapper::{MapOutput, MappedEdge, MappedFile, MappedSymbol};
pub use query::QueryLayer;
pub use store::Store;
pub use types::{EdgeKind, FileId, RepoId, Span, SymbolId, SymbolKind};
