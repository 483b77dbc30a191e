//! Shared integration test helpers

#![allow(dead_code)]

pub mod fakes;
pub mod test_context;
pub mod test_data;

pub use fakes::{FakeNotion, MemoryDb, RecordingChatClient};
pub use test_context::{TestContext, NOTION_TOKEN};
pub use test_data::*;
