// Music player internals
pub mod dispatcher;
pub mod embedded_messages;
pub mod event_handlers;
pub mod music_manager;
pub mod queue_manager;
pub mod responses;
pub mod transport;
