//! Linux procfs mount sources.

pub mod mountinfo;
