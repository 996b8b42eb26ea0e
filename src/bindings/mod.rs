// src/bindings/mod.rs

//! Hand-written declarations for the native `asl.h` interface.

pub mod asl_h;
