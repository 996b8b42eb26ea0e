// src/libload/mod.rs

//! Dynamic loading of the platform logging library.

pub mod asl_dlopen2;
