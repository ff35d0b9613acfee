#![allow(clippy::unwrap_used, clippy::expect_used)]

mod process;
mod support;
