//! Service-specific tests
