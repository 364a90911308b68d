//! Test suites for the RESTCONF gateway.

mod support;
