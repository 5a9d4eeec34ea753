//! Unit tests for the SQLite persistence layer.
//!
//! Every test provisions its own on-disk database through
//! [`crate::test_fixtures::TestDatabase`], so tests run in parallel without
//! sharing state and each one starts from a freshly migrated schema with
//! the root folder bootstrapped.

mod note_store_tests;
