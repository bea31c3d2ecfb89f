//! Password hashing for the bootstrap superuser and self-service credential
//! updates. Permission evaluation itself lives in [`crate::decision`].

pub mod password;

pub use password::{hash_password, verify_password};
