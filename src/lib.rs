use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub mod actions;
pub mod assemble;
pub mod common;
pub mod config;
pub mod dataset;
pub mod error;
pub mod normalize;
