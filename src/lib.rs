use anyhow::Result;
use log::LevelFilter;

pub mod callable;
pub mod database;
pub mod firebase;
pub mod hours;
pub mod messaging;
pub mod notify;
pub mod sanitize;
pub mod trigger;
pub mod types;

pub const APP_NAME: &str = "squadron-schedule";

pub fn set_up_logger(calling_module: &str, verbose: bool) -> Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(LevelFilter::Warn)
        .level_for(module_path!(), level)
        .level_for(calling_module.to_owned(), level)
        .chain(std::io::stdout())
        .apply()?;

    Ok(())
}
