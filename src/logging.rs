//! Pretty-printing messages to the console

use colored::Colorize;

/// Pretty-print an error message to the console
pub fn error(error_message: String) {
    let error_title = "error:".red().bold();
    eprintln!("{} {}", error_title, error_message);
}

/// Pretty-print a warning message to the console
pub fn warning(message: String, line_number: usize) {
    let warning = "warning:".yellow().bold();
    eprintln!("{} line {}: {}", warning, line_number, message);
}

/// Pretty-print a one-line summary after a unit failed to assemble
pub fn unit_failed(base_name: &str, n_errors: usize) {
    let tag = "failed:".red().bold();
    let plural = if n_errors == 1 { "" } else { "s" };
    eprintln!("{} {} ({} error{}, no output written)", tag, base_name, n_errors, plural);
}
