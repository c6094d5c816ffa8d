use std::io;
use std::process::ExitCode;

use fat32_impl::config::{self, Config};
use fat32_impl::disk::ImageFile;
use fat32_impl::fat32::Fat32;
use fat32_impl::logger;
use fat32_impl::shell::{self, Session};

fn main() -> ExitCode {
    let env_level = std::env::var(config::LOG_ENV).ok();
    let cfg = match Config::from_args(std::env::args().skip(1), env_level.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("fat32_shell: {e}");
            eprintln!("{}", config::USAGE);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = logger::init(cfg.log_level, cfg.color) {
        eprintln!("fat32_shell: logger already installed: {e}");
    }

    let image = match ImageFile::open(&cfg.image) {
        Ok(image) => image,
        Err(e) => {
            log::error!("cannot open {}: {e}", cfg.image.display());
            eprintln!("Error opening image file: {e}");
            return ExitCode::FAILURE;
        }
    };
    let fs = match Fat32::mount(image) {
        Ok(fs) => fs,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut session = Session::new(fs, cfg.image.display().to_string(), cfg.grow_dirs);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    match shell::run(&mut session, stdin.lock(), &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
