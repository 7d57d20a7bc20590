//! Domain models shared by the gateway and the ingestion job

mod category;
mod document;

pub use category::Category;
pub use document::{
    Document, QueryLogRecord, ResultItem, DEFAULT_CATEGORY_SENTINEL, NO_DATE, NO_DESCRIPTION,
    NO_HEADLINE, NO_SOURCE,
};
