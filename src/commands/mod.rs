//! Command implementations for the graphpack CLI

pub mod cache;
pub mod completions;
pub mod deploy;
pub mod fetch;
pub mod helpers;
pub mod install;
pub mod list;
pub mod remote;
pub mod show;
