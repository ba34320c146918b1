pub mod agent;
pub mod audit;
pub mod config;
pub mod llm;
pub mod repl;
/// Project directory with proposals, reflections and the audit trail.
pub mod store;
pub mod tools;
