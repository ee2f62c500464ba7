//! Temperature Monitor - 体温监测工具
//!
//! 记录体温读数、计算统计、标记异常读数，并在需要时通知看护人

pub mod config;
pub mod error;
pub mod health;
pub mod monitor;
pub mod notify;
pub mod presenter;
pub mod testing;

pub use anyhow::Result;
