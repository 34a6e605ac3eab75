mod common;
mod scoring;
mod sync;
