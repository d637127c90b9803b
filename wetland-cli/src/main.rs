//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

#[expect(clippy::print_stderr, reason = "the binary reports failures on stderr")]
fn main() {
    if let Err(err) = wetland_cli::run() {
        eprintln!("wetland: {err}");
        std::process::exit(1);
    }
}
