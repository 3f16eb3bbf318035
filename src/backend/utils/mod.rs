//! Small helpers shared by services

pub mod id_merge;

pub use id_merge::{id_arr_merge, IdUpdate};
