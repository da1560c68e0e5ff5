#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    ContentSource, ContentWriter, InMemoryRepository, ProgressQueries, ProgressRecorder, Storage,
    StorageError, StudyItemKind,
};
