//! Convenient imports for typical `tablemap` usage.
//!
//! ```ignore
//! use tablemap::prelude::*;
//! ```

pub use crate::options::{and, in_list, limit, offset, order, where_};
pub use crate::{
    Direction, Entity, ExecResult, Executor, Mapper, MapperConfig, OrmError, OrmResult,
    SelectOption, Value, params,
};
