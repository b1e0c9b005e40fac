//! Test suites for the diagnostics shell.

pub(crate) mod support;
