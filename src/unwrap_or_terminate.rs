//! `main`'s translation of any fatal `Error` into a one-line diagnostic and
//! a non-zero exit code.

use colored::Colorize;

pub trait UnwrapOrTerminate<T> {
    fn unwrap_or_terminate(self) -> T;
}

impl<T, E> UnwrapOrTerminate<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn unwrap_or_terminate(self) -> T {
        match self {
            Ok(t) => t,
            Err(err) => {
                log::error!("{err}");
                eprintln!("{}", format!("repomake: {err}").red());
                std::process::exit(1);
            }
        }
    }
}

impl<T> UnwrapOrTerminate<T> for Option<T> {
    fn unwrap_or_terminate(self) -> T {
        match self {
            Some(t) => t,
            None => {
                eprintln!("{}", "repomake: no target given and nothing to generate".red());
                std::process::exit(1);
            }
        }
    }
}
