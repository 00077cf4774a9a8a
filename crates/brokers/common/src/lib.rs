pub mod simulated;

pub use simulated::{SimulatedTerminal, SimulatedTerminalConfig};
