#[cfg(not(target_os = "linux"))]
compile_error!("No supported on non-linux system.");

use libstack_print::config::{Config, USAGE};
use libstack_print::utils::ResultLogExt;
use libstack_print::{logging, run, run_with};
use std::{env, process::exit};

#[cfg(target_os = "linux")]
fn main() {
    logging::init();

    let args: Vec<String> = env::args().collect();
    if args.len() == 1 {
        run();
        return;
    }
    let args_slice: Vec<&str> = args.iter().skip(1).map(|s| s.as_str()).collect();
    match Config::from_args(&args_slice) {
        Ok(config) if config.show_help => println!("{USAGE}"),
        Ok(config) => {
            if run_with(&config).log_error().is_none() {
                exit(1);
            }
        }
        Err(err) => {
            log::error!("{err}");
            eprintln!("{USAGE}");
            exit(1);
        }
    }
}
