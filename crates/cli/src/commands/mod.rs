pub mod availability;
pub mod config_cmd;
pub mod embed;
pub mod intent;
pub mod quota;
