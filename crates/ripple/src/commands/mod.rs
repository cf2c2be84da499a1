//! Command implementations that are not plain engine operations.

pub mod init;
