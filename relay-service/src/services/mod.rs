pub mod contact_graph;
pub mod key_directory;
pub mod message_store;
