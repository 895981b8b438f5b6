//! Domain layer

pub mod devfile;
pub mod token;
pub mod types;
pub mod variable;
pub mod workspace;
