//! Backend integration tests
//!
//! End-to-end tests running whole IR modules through the PowerPC-64
//! backend and checking the emitted assembly text.

mod integration_tests;
