//! Service layer

pub mod create;
pub mod workspace;
