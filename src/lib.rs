pub mod badges;
pub mod cli;
pub mod config;
pub mod models;
pub mod swagent;
pub mod xwdb;
