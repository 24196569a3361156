//! The weather forecast command.
//!
//! Forecasts are fetched from the National Weather Service and can be saved to a database so the
//! most recent forecast for a location can be reported later.

mod cli;
mod logs;

fn main() {
    let args = cli::get().get_matches();
    if let Err(error) = cli::initialize_and_run(args) {
        eprintln!("{error}");
        std::process::exit(1);
    }
}
