//! Binary that emits command-line options markdown to stdout.
//!
//! The docs build pipes this into `docs/command-line-options.md`.

fn main() {
    print!("{}", datablend_cli::render_options_markdown());
}
