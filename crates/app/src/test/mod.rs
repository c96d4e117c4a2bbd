mod context;

pub(crate) use context::{PgTestContext, TestContext};
pub(crate) use memory::MemoryStore;
