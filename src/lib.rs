//! Tattant API - backend for the Tattant loyalty app
//!
//! This crate provides:
//! - Email/password, one-time-password and Google sign-in
//! - Loyalty points and coupons purchasable with points
//! - A pass-through dictionary search proxy for the browser client
//! - Schema migration helpers on top of the `migration` crate

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
