#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use clap::Parser;
use iced::{Application, Settings, Size};

use patch_upscaler::logging::{self, log_message};
use patch_upscaler::{App, AppConfig};

pub fn main() -> iced::Result {
    let config = AppConfig::parse();

    logging::init((!config.no_log_file).then_some(config.log_file.as_path()));
    log_message(&format!(
        "Starting with model {}, {:?} controls, {:?} progress",
        config.model, config.controls, config.progress
    ));

    let mut settings = Settings::with_flags(config);
    settings.window.size = Size::new(1100.0, 800.0);
    settings.default_text_size = 14.into();
    App::run(settings)
}
