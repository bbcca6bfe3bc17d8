pub mod config_cmd;
pub mod gateway;
pub mod models;
pub mod onboard;
pub mod run;
pub mod template;
