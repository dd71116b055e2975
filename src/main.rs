mod app;
mod config;
mod input;
mod model;
mod render;
mod sim;
mod stones;
mod storage;
mod weather;

use anyhow::Result;

fn main() -> Result<()> {
    app::run()
}
