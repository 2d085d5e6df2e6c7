pub mod cache;
pub mod command;
pub mod executor;
pub mod relation;
pub mod session;
pub mod store;

pub use cache::{CacheInvalidator, CachedPlan, PlanCache, UncacheError};
pub use command::{Command, CommandOutput};
pub use executor::{CommandError, CommandExecutor};
pub use relation::{
    MemoryResolver, Relation, RelationKind, RelationResolver, ResolveError, ResolvedRelation, Row,
    RowSource, PATH_OPTION,
};
pub use session::{DatabaseRef, Session};
pub use store::{CatalogError, CatalogStore};
