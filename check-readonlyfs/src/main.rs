use check_readonlyfs::check::ServiceState;
use check_readonlyfs::cli::Cli;
use check_readonlyfs::{logging, plugin};
use clap::error::ErrorKind;
use clap::Parser;
use std::io;
use std::process;

fn main() {
    logging::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let state = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ServiceState::Ok,
                _ => ServiceState::Unknown,
            };
            process::exit(state.exit_code());
        }
    };

    let state = plugin::run_with(
        &cli,
        rofs_mountlist::read_file_system_list,
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    )
    .unwrap_or_else(|err| {
        log::error!("{err:#}");
        ServiceState::Unknown
    });
    process::exit(state.exit_code());
}
