//! Simulation host tests.


/// Config and trace files.
pub mod loader;

/// Built-in scenarios end to end.
pub mod scenarios;

/// Full runs through the reference host.
pub mod simulator;
