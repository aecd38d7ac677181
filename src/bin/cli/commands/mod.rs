pub mod note;
pub mod scan;
pub mod sync;
pub mod watch;
