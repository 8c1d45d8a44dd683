use std::path::Path;
use std::time::Instant;

use bunt::termcolor::{ColorChoice, StandardStream};

use crate::config::Config;
use crate::generator;
use crate::Result;

pub struct BuildCommand {}

impl BuildCommand {
    pub fn run(config: Config, input_dir: &Path) -> Result<()> {
        let mut stdout = if config.color_enabled() {
            StandardStream::stdout(ColorChoice::Auto)
        } else {
            StandardStream::stdout(ColorChoice::Never)
        };

        bunt::writeln!(stdout, "{$bold}{$blue}Volcano | Build{/$}{/$}")?;
        bunt::writeln!(stdout, "Building site into {$bold}{}{/$}\n", config.output.display())?;

        let start = Instant::now();
        let report = generator::build(&config, input_dir)?;
        let duration = start.elapsed();

        bunt::writeln!(
            stdout,
            "Built {$bold}{}{/$} page(s) in {$bold}{:?}{/$}\n",
            report.page_count,
            duration
        )?;

        if !report.broken_links.is_empty() {
            bunt::writeln!(stdout, "{$bold}{$yellow}WARNING{/$}{/$} allowed broken link(s):")?;
            for (page, broken) in &report.broken_links {
                bunt::writeln!(stdout, "  {} -> {}", page.display(), broken.join(", "))?;
            }
        }

        Ok(())
    }
}
