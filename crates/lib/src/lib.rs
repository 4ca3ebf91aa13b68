//! petpal core library: favorite-pet tools bound to a user at runtime, an agent
//! turn that drives them through a chat model, and the event stream that turn emits.

pub mod agent;
pub mod config;
pub mod events;
pub mod llm;
pub mod registry;
pub mod tools;
