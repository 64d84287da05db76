//! Core library for fitmeal: the SQLite store, the credential routines, and
//! the catalog synchronizer that populates exercise and meal reference data
//! from the upstream APIs.

pub mod catalog;
pub mod credentials;
pub mod db;
pub mod error;
pub mod models;
pub mod password;
pub mod service;
pub mod upstream;

pub use error::{Error, Result};
