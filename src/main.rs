use std::path::PathBuf;
use std::process::ExitCode;

use bunt::termcolor::{ColorChoice, StandardStream};
use clap::{Parser, Subcommand};

use volcano::assets;
use volcano::build::BuildCommand;
use volcano::config::Config;
use volcano::serve::{ServeCommand, ServeOptions};

/// A static documentation site generator with wiki links, search, and PWA support.
#[derive(Parser, Debug)]
#[command(name = "volcano", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Disable colored terminal output.
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a static site from a directory of Markdown files.
    Build {
        /// Directory containing the Markdown source tree.
        input: PathBuf,

        /// Output directory (overrides `volcano.json`'s `output` field).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the build even if it contains broken internal links.
        #[arg(long)]
        allow_broken_links: bool,
    },

    /// Serve a directory of Markdown files, re-rendering every request.
    Serve {
        /// Directory containing the Markdown source tree.
        input: PathBuf,

        /// Port to listen on (a free port is chosen automatically if omitted).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the default theme CSS to stdout, or write it to a file.
    Css {
        /// Destination file; defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Build { input, output, allow_broken_links } => {
            run_build(&input, output, allow_broken_links, cli.no_color)
        }
        Command::Serve { input, port } => run_serve(&input, port, cli.no_color),
        Command::Css { output } => run_css(output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err, cli.no_color);
            ExitCode::FAILURE
        }
    }
}

fn run_build(input: &std::path::Path, output: Option<PathBuf>, allow_broken_links: bool, no_color: bool) -> volcano::Result<()> {
    let mut config = Config::load(input)?;
    if let Some(output) = output {
        config.output = output;
    }
    if allow_broken_links {
        config.allow_broken_links = true;
    }
    if no_color {
        config.disable_colors();
    }

    BuildCommand::run(config, input)
}

fn run_serve(input: &std::path::Path, port: Option<u16>, no_color: bool) -> volcano::Result<()> {
    let mut config = Config::load(input)?;
    if no_color {
        config.disable_colors();
    }

    ServeCommand::run(ServeOptions { port }, config, input)
}

fn run_css(output: Option<PathBuf>) -> volcano::Result<()> {
    let config = Config::default();
    let (_, bytes) = assets::build(&config, "theme.css")?;

    match output {
        Some(path) => std::fs::write(&path, &bytes).map_err(|e| volcano::Error::asset(path.display().to_string(), e)),
        None => {
            print!("{}", String::from_utf8_lossy(&bytes));
            Ok(())
        }
    }
}

fn report_error(err: &volcano::Error, no_color: bool) {
    let mut stderr = if no_color {
        StandardStream::stderr(ColorChoice::Never)
    } else {
        StandardStream::stderr(ColorChoice::Auto)
    };
    let _ = bunt::writeln!(stderr, "{$bold}{$red}error:{/$}{/$} {}", err);
}
