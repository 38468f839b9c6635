pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impactu;
pub mod normalize;
pub mod output;
pub mod store;
