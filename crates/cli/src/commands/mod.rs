pub mod demo;
pub mod reset;
pub mod seed;
