//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the fee ledger using SQLx: the connection pool,
//! embedded migrations, stateless repositories and the `PostgresFeeStore`
//! adapter that implements the application store port.
//!
//! # Consistency
//!
//! A unit of work is one database transaction. The company's account row is
//! locked first (`SELECT ... FOR UPDATE`), then the document being changed,
//! so two workflows touching the same company always serialize while
//! different companies proceed in parallel. Document numbers come from a
//! counter table updated in the same transaction.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, PostgresFeeStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/fees")).await?;
//! let store = PostgresFeeStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, DatabaseConfig, create_pool, run_migrations};
pub use error::DatabaseError;
pub use adapters::{PgUnitOfWork, PostgresFeeStore};
