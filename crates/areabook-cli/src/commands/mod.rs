pub mod common;
pub mod completions;
pub mod history;
pub mod lock;
pub mod records;
pub mod resolve;
pub mod session;
