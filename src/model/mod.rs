pub mod task;
pub mod task_path;
pub mod task_ref;
pub mod timestamp;
