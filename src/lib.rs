pub mod catalog;
pub mod config;
pub mod conflict;
pub mod dead_lock_detector;
pub mod lock;
pub mod lock_mgr;
pub mod lock_mgr_macro;
pub mod operation;
pub mod operation_scheduler;
pub mod protocol;
pub mod repl;
pub mod session;
