mod process_id;

pub use process_id::{process_id, sanitize_id};
