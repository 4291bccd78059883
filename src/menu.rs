use crate::aggregate::Granularity;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::loader::Loader;
use crate::repair::FillPolicy;
use crate::session::Session;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Load,
    Aggregate,
    Statistics,
    Visualize,
    Quit,
}

impl MenuAction {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "1" | "load" => Some(MenuAction::Load),
            "2" | "aggregate" => Some(MenuAction::Aggregate),
            "3" | "statistics" | "stats" => Some(MenuAction::Statistics),
            "4" | "visualize" | "plot" => Some(MenuAction::Visualize),
            "5" | "quit" | "q" | "exit" => Some(MenuAction::Quit),
            _ => None,
        }
    }
}

const MAIN_MENU: &str = "\
What do you wish to do?
(1) Load data
(2) Aggregate data
(3) Display statistics
(4) Visualize electricity consumption
(5) Quit";

/// Map a menu answer to a fill policy: a number `1..=3` or a policy name.
pub fn parse_policy_choice(input: &str) -> Result<FillPolicy> {
    match input.trim() {
        "1" => Ok(FillPolicy::ForwardFill),
        "2" => Ok(FillPolicy::BackwardFill),
        "3" => Ok(FillPolicy::Drop),
        other => other.parse(),
    }
}

/// Map a menu answer to a granularity; `None` means "no aggregation".
pub fn parse_granularity_choice(input: &str) -> Result<Option<Granularity>> {
    match input.trim() {
        "1" => Ok(Some(Granularity::Hour)),
        "2" => Ok(Some(Granularity::Day)),
        "3" => Ok(Some(Granularity::Month)),
        "4" => Ok(Some(Granularity::HourOfDay)),
        "5" | "none" => Ok(None),
        other => other.parse().map(Some),
    }
}

/// Interactive loop over a line-oriented input and an output.
pub struct Menu<R, W> {
    input: R,
    output: W,
    config: Config,
    loader: Loader,
    session: Session,
}

impl<R: BufRead, W: Write> Menu<R, W> {
    pub fn new(input: R, output: W, config: Config) -> Self {
        let loader = Loader::new(config.loader.failure_threshold);
        Self {
            input,
            output,
            config,
            loader,
            session: Session::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Run until the user quits or input ends.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let Some(answer) = self.ask(MAIN_MENU)? else {
                return Ok(());
            };

            let outcome = match MenuAction::parse(&answer) {
                Some(MenuAction::Load) => self.load(),
                Some(MenuAction::Aggregate) => self.aggregate(),
                Some(MenuAction::Statistics) => self.statistics(),
                Some(MenuAction::Visualize) => self.visualize(),
                Some(MenuAction::Quit) => {
                    writeln!(self.output, "Thank you for using our program :)")?;
                    return Ok(());
                }
                None => {
                    writeln!(self.output, "Please pick a valid option")?;
                    continue;
                }
            };

            // The loop always returns to its prompt; the session is unchanged on error
            match outcome {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(e) => {
                    error!("{}", e);
                    writeln!(self.output, "Error: {}", e)?;
                }
            }
        }
    }

    /// Print `question` and read one trimmed line. `None` on end of input.
    fn ask(&mut self, question: &str) -> Result<Option<String>> {
        writeln!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn resolve_file(&self, name: &str) -> Result<PathBuf> {
        if !self.config.data.has_known_extension(name) {
            return Err(AppError::InvalidArgument(format!(
                "'{}' does not have a recognized extension ({})",
                name,
                self.config.data.extensions.join(", ")
            )));
        }

        let direct = PathBuf::from(name);
        if direct.exists() {
            return Ok(direct);
        }
        let in_data_dir = self.config.data.directory.join(name);
        if in_data_dir.exists() {
            return Ok(in_data_dir);
        }

        Err(AppError::NotFound(format!("File '{}' does not exist", name)))
    }

    fn load(&mut self) -> Result<bool> {
        let available = self.config.data.discover_files();
        let mut question = String::from("Please enter the name of the data file:");
        if !available.is_empty() {
            question.push_str("\nAvailable files:");
            for file in &available {
                question.push_str(&format!("\n  {}", file.display()));
            }
        }

        let Some(name) = self.ask(&question)? else {
            return Ok(false);
        };
        let path = self.resolve_file(&name)?;

        let question = format!(
            "How should corrupted measurements be handled? [default: {}]\n\
             (1) Forward fill\n(2) Backward fill\n(3) Drop",
            self.config.loader.default_policy
        );
        let Some(answer) = self.ask(&question)? else {
            return Ok(false);
        };
        let policy = if answer.is_empty() {
            self.config.loader.default_policy
        } else {
            parse_policy_choice(&answer)?
        };

        let (session, report) = self.session.load(&self.loader, &path, policy)?;
        self.session = session;

        writeln!(
            self.output,
            "Loaded {} measurements from {} ({} incomplete rows, {} dropped, {} fields filled{})",
            report.rows_loaded,
            path.display(),
            report.repair.rows_with_missing,
            report.repair.rows_dropped,
            report.repair.fields_filled,
            if report.repair.degraded_to_drop {
                ", fill fell back to drop"
            } else {
                ""
            }
        )?;
        Ok(true)
    }

    fn aggregate(&mut self) -> Result<bool> {
        let question = "How should the data be aggregated?\n\
                        (1) Consumption per hour\n\
                        (2) Consumption per day\n\
                        (3) Consumption per month\n\
                        (4) Hour-of-day consumption (average)\n\
                        (5) No aggregation";
        let Some(answer) = self.ask(question)? else {
            return Ok(false);
        };
        let granularity = parse_granularity_choice(&answer)?;

        let session = self.session.aggregate(granularity)?;
        self.session = session;

        match self.session.aggregated() {
            Some((view, g)) => {
                info!("Aggregation set to {}", g);
                writeln!(self.output, "Aggregated into {} {} buckets", view.len(), g)?;
            }
            None => writeln!(self.output, "Aggregation cleared")?,
        }
        Ok(true)
    }

    fn statistics(&mut self) -> Result<bool> {
        let table = self.session.statistics()?;
        writeln!(self.output, "{}", table)?;
        Ok(true)
    }

    #[cfg(feature = "plot")]
    fn visualize(&mut self) -> Result<bool> {
        let current = self.session.current().ok_or_else(|| {
            AppError::InvalidArgument("No data loaded, load a file first".to_string())
        })?;
        let granularity = self.session.aggregated().map(|(_, g)| g);

        let path = crate::plot::render_chart(current, granularity, &self.config.plot)?;
        writeln!(self.output, "Chart written to {}", path.display())?;
        Ok(true)
    }

    #[cfg(not(feature = "plot"))]
    fn visualize(&mut self) -> Result<bool> {
        writeln!(
            self.output,
            "Charts are unavailable, rebuild with the `plot` feature"
        )?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_action() {
        assert_eq!(MenuAction::parse("1"), Some(MenuAction::Load));
        assert_eq!(MenuAction::parse(" 5 "), Some(MenuAction::Quit));
        assert_eq!(MenuAction::parse("Stats"), Some(MenuAction::Statistics));
        assert_eq!(MenuAction::parse("7"), None);
    }

    #[test]
    fn test_policy_choice() {
        assert_eq!(parse_policy_choice("1").unwrap(), FillPolicy::ForwardFill);
        assert_eq!(parse_policy_choice("drop").unwrap(), FillPolicy::Drop);
        assert!(matches!(
            parse_policy_choice("9"),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_granularity_choice() {
        assert_eq!(
            parse_granularity_choice("4").unwrap(),
            Some(Granularity::HourOfDay)
        );
        assert_eq!(parse_granularity_choice("5").unwrap(), None);
        assert_eq!(
            parse_granularity_choice("month").unwrap(),
            Some(Granularity::Month)
        );
        assert!(parse_granularity_choice("0").is_err());
    }

    #[test]
    fn test_invalid_option_reprompts() {
        let input = "9\n5\n".as_bytes();
        let mut menu = Menu::new(input, Vec::new(), Config::default());
        menu.run().unwrap();

        let output = String::from_utf8(menu.into_output()).unwrap();
        assert!(output.contains("Please pick a valid option"));
        assert!(output.contains("Thank you for using our program"));
    }

    #[test]
    fn test_statistics_without_data_reports_error() {
        let input = "3\n".as_bytes();
        let mut menu = Menu::new(input, Vec::new(), Config::default());
        menu.run().unwrap();

        let output = String::from_utf8(menu.into_output()).unwrap();
        assert!(output.contains("Error: Invalid argument: No data loaded"));
    }
}
