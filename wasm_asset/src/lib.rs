pub mod config;
pub mod error;
pub mod host;
pub mod loader;
pub mod logging;
pub mod package;
pub mod parse;
pub mod pipeline;
pub mod rewrite;
pub mod session;
pub mod tools;
pub mod url;
pub mod wrapper;

#[cfg(test)]
mod loader_test;
#[cfg(test)]
mod rewrite_test;
#[cfg(test)]
mod session_test;
