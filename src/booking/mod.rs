pub mod assembler;
pub mod planner;
pub mod session_storage;
pub mod status;
pub mod validation;
