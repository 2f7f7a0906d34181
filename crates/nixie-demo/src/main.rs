//! Interactive ripple demo.
//!
//! Usage: `nixie-demo [image]` — move the mouse over the window to stir the
//! water, click for a big drop, space pauses, escape quits.

mod app;

use std::path::PathBuf;

use anyhow::Result;

use nixie_engine::logging::{LoggingConfig, init_logging};

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let image_path = std::env::args().nth(1).map(PathBuf::from);
    if image_path.is_none() {
        log::info!("no background image given; rippling over a blank surface");
    }

    app::App::new(image_path).run()
}
