mod build;
mod check_config;
mod run;

pub(crate) use build::cmd_build;
pub(crate) use check_config::cmd_check_config;
pub(crate) use run::cmd_run;
