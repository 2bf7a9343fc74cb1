pub mod clean;
pub mod config;
pub mod dashboard;
pub mod features;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod opponent;
pub mod pipeline;
pub mod prematch;
pub mod records;
pub mod state;
pub mod swap;
pub mod table;
pub mod team_stats;
pub mod training;
