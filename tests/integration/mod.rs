//! Integration tests for askdb.

pub mod audit_test;
pub mod pipeline_test;
