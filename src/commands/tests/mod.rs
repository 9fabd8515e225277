//! Tests for the CLI commands
