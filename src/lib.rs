pub mod geometry;
pub mod io;
pub mod persistence;
pub mod session;
pub mod subsystem;
pub mod world;
