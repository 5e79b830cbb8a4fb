use crate::{app::App, config::Config, snoobrowse_error::SnoobrowseError};

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

mod app;
mod component;
mod config;
mod model;
mod reddit_api;
mod snoobrowse_error;
mod state;
mod widget;

#[tokio::main]
async fn main() -> Result<(), SnoobrowseError> {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();
    #[cfg(debug_assertions)]
    {
        use log::debug;
        tui_logger::init_logger(log::LevelFilter::Trace)?;
        tui_logger::set_default_level(log::LevelFilter::Debug);
        debug!("App started")
    }

    let config = Config::load()?;

    let mut terminal = ratatui::init();
    let app_result = match App::new(config) {
        Ok(mut app) => app.run(&mut terminal).await,
        Err(e) => Err(e),
    };

    ratatui::restore();

    app_result
}
