pub mod executor;
pub mod manager;
pub mod models;
pub mod pagination;
pub mod query_builder;
pub mod record;
pub mod store;
pub mod value;

pub use executor::{Executor, PgExecutor, ResultRow};
pub use manager::{DatabaseError, DatabaseManager};
pub use pagination::{Page, Paginate};
pub use query_builder::{ColumnValues, PreparedQuery, QueryBuilder, Statement};
pub use record::Record;
pub use store::DataStore;
pub use value::SqlValue;
