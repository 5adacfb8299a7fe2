//! configmerge: merge layered configuration files into one document

use std::process::ExitCode;

fn main() -> ExitCode {
    configmerge::cli::run()
}
