mod catalog;
mod config;
mod engine;
mod mpris;
mod notify;
mod runtime;
mod session;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run()
}
