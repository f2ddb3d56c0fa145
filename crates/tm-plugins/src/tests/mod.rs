//! Crate-level fixtures and behaviour tests.

#[cfg(unix)]
pub(crate) mod support;
