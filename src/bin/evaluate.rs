/**
 * RecoLab
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use std::env;
use std::process;

use getopts::Options;
use scoped_pool::Pool;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use recolab::io;
use recolab::stats::DataDictionary;
use recolab::{Config, RecoError};

fn main() {

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "inputfile", "Input file name (required). The input consists of ratings \
        of items by users. The input file must contain a user, item and rating triple per line, \
        separated by tabs. A fourth column such as a timestamp is ignored.", "PATH");
    opts.optopt("c", "config", "Configuration file in JSON format (optional, defaults to \
        evaluating POPULAR, UBCF and IBCF with default parameters).", "PATH");
    opts.optopt("o", "outputfile", "Output file name for the JSON report (optional, output will \
        be written to stdout by default).", "PATH");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    if matches.opt_present("h") {
        return print_usage_and_exit(&program, opts, None);
    }

    let ratings_path = match matches.opt_str("i") {
        Some(path) => path,
        None => return print_usage_and_exit(
            &program,
            opts,
            Some("Please specify an inputfile via --inputfile."),
        ),
    };

    if let Err(failure) = run(&ratings_path, matches.opt_str("c"), matches.opt_str("o")) {
        error!("{}", failure);
        process::exit(1);
    }
}

fn print_usage_and_exit(
    program: &str,
    opts: Options,
    hint: Option<&str>
) {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    let brief = format!("Usage: {} [options]", program);
    eprint!("{}", opts.usage(&brief));
    process::exit(if hint.is_some() { 2 } else { 0 });
}

fn run(
    ratings_path: &str,
    config_path: Option<String>,
    report_path: Option<String>,
) -> Result<(), RecoError> {

    let config = match config_path {
        Some(path) => Config::from_path(&path)?,
        None => Config::default(),
    };

    // Fail on bad parameters before reading any data
    config.validate()?;

    info!("Reading ratings from {}", ratings_path);

    let mut reader = io::csv_reader(ratings_path)?;
    let (data_dict, ratings) = DataDictionary::build_store(
        io::ratings_from_csv(&mut reader),
        config.scale,
        config.strict,
    )?;

    info!(
        "Found {} ratings between {} users and {} items.",
        data_dict.num_ratings(),
        data_dict.num_users(),
        data_dict.num_items(),
    );

    let pool = Pool::new(num_cpus::get());
    let report = recolab::evaluate_methods(&ratings, &config, &pool);
    pool.shutdown();

    io::write_report(&report?, report_path)
}
