use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::process;

use log::{debug, error};

use gerrit_translator as translator;
use gerrit_translator_cdevents as cdevents;
use translator::args;

fn open_input(args: &args::Args) -> io::Result<Box<dyn BufRead>> {
    let input: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };
    Ok(input)
}

fn main() {
    let args = args::parse_args();

    let mut stderr_log = stderrlog::new();
    stderr_log
        .module(module_path!())
        .timestamp(stderrlog::Timestamp::Second)
        .verbosity(match (args.quiet, args.verbose) {
            (true, _) => 0,      // ERROR
            (false, false) => 2, // INFO
            (_, true) => 4,      // TRACE
        });
    if let Err(e) = stderr_log.init() {
        eprintln!("Could not initialize logging: {}", e);
        process::exit(2);
    }

    let config = match &args.config {
        Some(path) => args::parse_config(path).unwrap_or_else(|e| {
            error!("{}", e);
            process::exit(2);
        }),
        None => args::Config::default(),
    };
    debug!("{:#?}", config);

    let translator = translator::Builder::new()
        .with_logger(translator::Logger::new(stderr_log.clone()))
        .with_default_origin_url(config.translator.default_origin_url)
        .build(cdevents::Factory::new(config.cdevents.spec_version));

    let mut headers = HashMap::new();
    if let Some(origin_url) = &args.origin_url {
        headers.insert(
            translator::ORIGIN_URL_HEADER.to_string(),
            origin_url.clone(),
        );
    }

    let mut input = open_input(&args).unwrap_or_else(|e| {
        error!("Could not open input: {}", e);
        process::exit(2);
    });

    if args.stream {
        for line in input.lines() {
            let line = line.unwrap_or_else(|e| {
                error!("Could not read event: {}", e);
                process::exit(2);
            });
            if line.trim().is_empty() {
                continue;
            }
            // failures are logged by the translator
            if let Ok(cdevent) = translator.translate(&line, &headers) {
                println!("{}", cdevent);
            }
        }
        return;
    }

    let mut event = String::new();
    if let Err(e) = input.read_to_string(&mut event) {
        error!("Could not read event: {}", e);
        process::exit(2);
    }
    match translator.translate(&event, &headers) {
        Ok(cdevent) => println!("{}", cdevent),
        Err(e) if e.is_ignored() => (),
        Err(_) => process::exit(1),
    }
}
