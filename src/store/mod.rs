pub mod checkpoint;
pub mod lock;
pub mod maildir;
pub mod sink;
