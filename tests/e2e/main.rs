//! End-to-end scenarios for local history.

mod harness;
