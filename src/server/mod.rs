// Server module entry
// HTTP front-end: listener, per-connection serving and the accept loop

pub mod connection;
pub mod listener;
pub mod signal;

// `loop` is a keyword, so the module is named server_loop
#[path = "loop.rs"]
pub mod server_loop;

pub use listener::bind_listener;
pub use server_loop::run_server_loop;
