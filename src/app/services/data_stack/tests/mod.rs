//! Tests for the bounded data stack

pub mod stack_tests;
