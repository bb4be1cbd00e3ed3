/**
 * SVPOI
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
use std::error::Error;
use std::process;

use getopts::Options;
use tracing_subscriber::EnvFilter;

use svpoi::io;
use svpoi::Properties;

fn main() {

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();

    process::exit(run(&args));
}

/// Parses the command line and trains, returns the exit code of the process.
fn run(args: &[String]) -> i32 {

    let program = args.first().map(|program| program.as_str()).unwrap_or("svpoi");

    let mut opts = Options::new();
    opts.optopt("r", "ratings", "Rating file name (required). The file must contain a user, an \
        item and a numeric rating per line, separated by tabs.", "PATH");
    opts.optopt("s", "social", "Social file name (required). The file must contain a user, a \
        trusted user and the strength of the trust per line, separated by tabs.", "PATH");
    opts.optopt("c", "conf", "Properties file with the training options (optional). Photo \
        features are read from dfs.data.dir/data.appender.photo.path if configured.", "PATH");
    opts.optmulti("D", "", "Sets or overrides a single option, e.g. -D rec.factor.number=20.",
        "KEY=VALUE");
    opts.optopt("o", "outputfile", "Output file name for the per-epoch losses (optional, output \
        will be written to stdout by default).", "PATH");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(args.iter().skip(1)) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage(program, opts, Some(&hint))
        },
    };

    if matches.opt_present("h") {
        return print_usage(program, opts, None);
    }

    let (ratings_path, social_path) = match (matches.opt_str("r"), matches.opt_str("s")) {
        (Some(ratings_path), Some(social_path)) => (ratings_path, social_path),
        _ => {
            return print_usage(
                program,
                opts,
                Some("Please specify a rating file via --ratings and a social file via --social."),
            );
        }
    };

    let properties = match load_properties(matches.opt_str("c"), matches.opt_strs("D")) {
        Ok(properties) => properties,
        Err(failure) => {
            let hint = format!("Problem with the configuration: {}", failure);
            return print_usage(program, opts, Some(&hint))
        },
    };

    match train(&ratings_path, &social_path, &properties, matches.opt_str("o")) {
        Ok(()) => 0,
        Err(failure) => {
            eprintln!("Training failed: {}", failure);
            1
        }
    }
}

/// Prints the usage, exit code 1 if there is a hint about what went wrong.
fn print_usage(
    program: &str,
    opts: Options,
    hint: Option<&str>
) -> i32 {

    let brief = format!("Usage: {} [options]", program);

    match hint {
        Some(hint) => {
            eprintln!("\n{}\n", hint);
            eprint!("{}", opts.usage(&brief));
            1
        },
        None => {
            print!("{}", opts.usage(&brief));
            0
        }
    }
}

fn load_properties(
    conf_path: Option<String>,
    overrides: Vec<String>,
) -> Result<Properties, svpoi::Error> {

    let mut properties = match conf_path {
        Some(path) => Properties::load(&path)?,
        None => Properties::new(),
    };

    for pair in overrides.iter() {
        properties.set_pair(pair)?;
    }

    Ok(properties)
}

fn train(
    ratings_path: &str,
    social_path: &str,
    properties: &Properties,
    report_path: Option<String>,
) -> Result<(), Box<dyn Error>> {

    println!("Reading ratings from {}", ratings_path);
    let ratings = io::read_ratings_file(ratings_path)?;

    println!("Reading social links from {}", social_path);
    let links = io::read_social_file(social_path)?;

    println!("Training on {} ratings and {} social links...", ratings.len(), links.len());
    let model = svpoi::fit(&ratings, &links, properties)?;

    println!(
        "Stopped after {} epochs ({:?}), final loss {:?}",
        model.summary.epochs.len(),
        model.summary.stop_reason,
        model.summary.final_loss(),
    );

    io::write_epoch_reports(&model.summary.epochs, report_path)?;

    Ok(())
}
