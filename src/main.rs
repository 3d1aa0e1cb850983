use clap::Parser;

use repomake::cli::{CommandLine, Subcommand};
use repomake::dist::NullDistSource;
use repomake::generator::Generator;
use repomake::input::Input;
use repomake::logger::Logger;
use repomake::output::{Output, ProgressBar};
use repomake::unwrap_or_terminate::UnwrapOrTerminate;

fn main() {
    let command_line = CommandLine::parse();
    let opts = match command_line.subcommand {
        Subcommand::Generate(opts) => opts,
    };

    let input: Input = Input::from_command_line(&opts).unwrap_or_terminate();

    let log_dir = input.root_dir.join(".repomake");
    std::fs::create_dir_all(&log_dir).unwrap_or_terminate();
    let _logger = Logger::init(&log_dir, log::LevelFilter::Info).unwrap_or_terminate();

    let output = Output::new();
    output.status(&format!("generating Makefile for {}", input.root_dir.display()));

    let progress = ProgressBar::new("parsing BUILD files and resolving the dependency graph");
    let generator = Generator::new(&input, Box::new(NullDistSource)).with_manifest_cache();
    let makefile = match generator.generate_makefile(opts.target.as_deref()) {
        Ok(mf) => mf,
        Err(err) => {
            progress.abandon_with_message("generation failed");
            Err::<String, _>(err).unwrap_or_terminate()
        }
    };
    progress.finish_with_message("dependency graph resolved");

    std::fs::create_dir_all(&input.object_dir.parent().unwrap_or(&input.object_dir))
        .unwrap_or_terminate();
    let makefile_path = input
        .object_dir
        .parent()
        .unwrap_or(&input.object_dir)
        .join("Makefile");
    std::fs::write(&makefile_path, makefile).unwrap_or_terminate();

    output.status(&format!("wrote {}", makefile_path.display()));
}
