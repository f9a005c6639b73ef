pub mod engine;
pub mod event;
pub mod memory;
pub mod resample;
pub mod sample;
pub mod storage;
pub mod types;

pub use engine::*;
pub use event::*;
pub use memory::*;
pub use resample::*;
pub use sample::*;
pub use storage::*;
pub use types::*;
