//! Client-side pieces: the local secret cache a device keeps between
//! syncs.

pub mod cache;

pub use cache::LocalCache;
