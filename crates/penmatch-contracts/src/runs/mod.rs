pub mod record_files;
pub mod summary;
