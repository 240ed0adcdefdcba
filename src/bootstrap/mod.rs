mod server;
mod service;
mod shutdown;
mod state;

pub use server::Server;
pub use service::FirewallService;
pub use shutdown::{Shutdown, ShutdownSignal, ShutdownState};
