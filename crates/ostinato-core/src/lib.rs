pub mod diagnostics;
pub mod notify;
pub mod rate_converter;
pub mod render_loop;
pub mod scheduler;
pub mod session;
pub mod shared;
pub mod state_snapshot;

pub use diagnostics::*;
pub use notify::*;
pub use rate_converter::*;
pub use render_loop::*;
pub use scheduler::*;
pub use session::*;
pub use shared::*;
pub use state_snapshot::*;
