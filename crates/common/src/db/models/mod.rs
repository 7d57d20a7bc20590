//! SeaORM entity models

mod query_log;

pub use query_log::{
    Model as QueryLog,
    ActiveModel as QueryLogActiveModel,
};
