mod detector;
mod history;
mod message;
mod sampler;
mod service;

pub use detector::WINDOW_MS;
pub use history::LoadHistory;
pub use message::{assemble, DISPLAY_WINDOW_MS};
pub use sampler::{CounterSource, ProcStatSource, Sampler};
pub use service::record_tick;
