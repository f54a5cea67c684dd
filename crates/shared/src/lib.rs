pub mod grid;
pub mod models;
pub mod security;
pub mod wallet;
