use rust_video_export::locator;
use rust_video_export::logging::{create_logger, LoggingError, Verbosity};
use std::path::PathBuf;
use std::process::exit;

/// Print the encoder this package would use for PACKAGE_ROOT, and which tier found it.
fn main() -> Result<(), LoggingError> {
    let args = std::env::args().collect::<Vec<String>>();
    if args.len() > 2 {
        println!("usage: {} [PACKAGE_ROOT]", args[0]);
        exit(1);
    }
    let root = PathBuf::from(args.get(1).map(String::as_str).unwrap_or("."));

    let logger = create_logger(Verbosity::Verbose, None)?;
    let resolved = locator::resolve_global(&root, &logger);
    println!("{} ({})", resolved.path().display(), resolved.source());

    Ok(())
}
