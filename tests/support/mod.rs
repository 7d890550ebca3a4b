#![allow(dead_code)]

pub mod catalog_mock;
pub mod socket_guard;
