pub mod billing;
pub mod connection;
#[cfg(test)]
pub mod memory;
pub mod schema;
pub mod seedfile;
pub mod store;
