pub mod condition;
pub mod context;
pub mod entry;
pub mod error;
pub mod ident;
pub mod instruction;
pub mod io;
pub mod registry;
pub mod schedule;
pub mod tag;

pub use condition::ScheduleCondition;
pub use context::TickContext;
pub use entry::ScheduleEntry;
pub use error::{Result, ScheduleError};
pub use ident::Identifier;
pub use instruction::ScheduleInstruction;
pub use registry::{Catalog, ConditionRole, ScheduleRegistry};
pub use schedule::Schedule;
