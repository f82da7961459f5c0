// Core modules implementing transfer, accumulation, tree access, and errors.
pub mod accumulator;
pub mod error;
pub mod extract;
pub mod transfer;
pub mod tree;
