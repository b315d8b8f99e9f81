// src/lib.rs
pub mod aim;
pub mod extractors;
pub mod portal;
pub mod storage;
pub mod timetable;
pub mod utils;
