pub mod dispatch;

pub use dispatch::{request_facts, DispatchLayer, DispatchService};
