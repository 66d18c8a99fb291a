mod codec;
mod config;
mod frontend;
mod hash;
mod i18n;
mod json;
mod timestamp;
mod todo;

use std::process::ExitCode;

use config::Config;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let config = Config::load();
    if let Some(language) = &config.language {
        i18n::set_language(language);
    }

    match frontend::cli::cli_main(&config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            frontend::tui::tui_main(config);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", fl!("cli-error", error = format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}
