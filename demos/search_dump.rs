use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    wikidump_search::example_apps::run_search_cli(std::env::args().skip(1))
}
