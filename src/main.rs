// src/main.rs
use std::fmt;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use timetable_extractor::aim::{self, Credentials};
use timetable_extractor::portal::{HttpBrowser, Navigator};
use timetable_extractor::storage::StorageManager;
use timetable_extractor::timetable;
use timetable_extractor::utils::{self, page_dump::PageDump, AppError};

/// Scrapes class timetables from eStudent and quiz marks from AIM
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Save every fetched page into this directory for debugging
    #[arg(long, global = true, env = "TIMETABLE_DEBUG_DIR")]
    debug_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the class timetable of one or more study periods
    Timetable {
        /// Study period as listed by the filter, e.g. "2016 Semester 1" (repeatable)
        #[arg(short, long = "period")]
        periods: Vec<String>,

        /// Fetch every study period the filter offers
        #[arg(long, conflicts_with = "periods")]
        all_periods: bool,

        /// Output directory for units.json and classes.json
        #[arg(short, long, default_value = "./timetables")]
        output_dir: PathBuf,

        /// Cookie header of an already signed-in eStudent session
        #[arg(long, env = "TIMETABLE_SESSION_COOKIE", hide_env_values = true)]
        session_cookie: Option<String>,

        #[arg(long, env = "TIMETABLE_BASE_URL", default_value = timetable::DEFAULT_BASE_URL)]
        base_url: String,
    },

    /// Fetch the quiz table of a subject and write it as an iCalendar file
    Quizzes {
        /// Subject as listed by the AIM subject drop-down
        #[arg(short, long)]
        subject: String,

        #[arg(long, env = "AIM_STUDENT_ID")]
        student_id: String,

        /// Prompted for when not given
        #[arg(long, env = "AIM_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        #[arg(short, long, default_value = "out.ics")]
        output: PathBuf,

        #[arg(long, env = "AIM_BASE_URL", default_value = aim::DEFAULT_BASE_URL)]
        base_url: String,
    },

    /// List the subjects AIM offers
    Subjects {
        #[arg(long, env = "AIM_BASE_URL", default_value = aim::DEFAULT_BASE_URL)]
        base_url: String,
    },
}

// Passwords and session cookies never reach the log
impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const REDACTED: &str = "<redacted>";
        match self {
            Command::Timetable { periods, all_periods, output_dir, session_cookie, base_url } => f
                .debug_struct("Timetable")
                .field("periods", periods)
                .field("all_periods", all_periods)
                .field("output_dir", output_dir)
                .field("session_cookie", &session_cookie.as_ref().map(|_| REDACTED))
                .field("base_url", base_url)
                .finish(),
            Command::Quizzes { subject, student_id, password, output, base_url } => f
                .debug_struct("Quizzes")
                .field("subject", subject)
                .field("student_id", student_id)
                .field("password", &password.as_ref().map(|_| REDACTED))
                .field("output", output)
                .field("base_url", base_url)
                .finish(),
            Command::Subjects { base_url } => f.debug_struct("Subjects").field("base_url", base_url).finish(),
        }
    }
}

fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::debug!("Starting with args: {:?}", args.command);

    match args.command {
        Command::Timetable { periods, all_periods, output_dir, session_cookie, base_url } => {
            if periods.is_empty() && !all_periods {
                return Err(AppError::Config("Pass at least one --period or --all-periods".to_string()));
            }

            let browser = browser(session_cookie.as_deref(), args.debug_dir.as_deref())?;
            let mut navigator = Navigator::new(browser);
            timetable::open_timetable(&mut navigator, &base_url)?;

            let periods = if all_periods { timetable::study_periods(&navigator)? } else { periods };
            tracing::info!("Fetching timetables for {:?}", periods);

            let units = timetable::aggregate(periods, &mut navigator)?.collect::<Result<Vec<_>, _>>()?;
            tracing::info!("Fetched {} units", units.len());

            let storage = StorageManager::new(&output_dir)?;
            storage.save_units(&units)?;
            storage.save_class_summary(&units)?;
        }
        Command::Quizzes { subject, student_id, password, output, base_url } => {
            let password = match password {
                Some(password) => password,
                None => rpassword::prompt_password(format!("AIM password for {}: ", student_id))?,
            };
            let credentials = Credentials { student_id, password };

            let mut navigator = Navigator::new(browser(None, args.debug_dir.as_deref())?);
            let quizzes = aim::fetch_quizzes(&mut navigator, &base_url, &subject, &credentials)?;
            tracing::info!("Found {} quizzes for {}", quizzes.len(), subject);

            let dir = match output.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let file_name = output
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| AppError::Config(format!("Invalid output file: {}", output.display())))?;

            StorageManager::new(dir)?.save_calendar(file_name, &subject, &quizzes)?;
        }
        Command::Subjects { base_url } => {
            let mut navigator = Navigator::new(browser(None, args.debug_dir.as_deref())?);
            for subject in aim::subject_names(&mut navigator, &base_url)? {
                println!("{}", subject);
            }
        }
    }

    tracing::info!("Done");
    Ok(())
}

fn browser(session_cookie: Option<&str>, debug_dir: Option<&Path>) -> Result<HttpBrowser, AppError> {
    let browser = HttpBrowser::new(session_cookie)?;
    Ok(match debug_dir {
        Some(dir) => browser.with_page_dump(PageDump::new(dir)?),
        None => browser,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiz_password_is_not_logged() {
        let args = Args::parse_from([
            "timetable-extractor",
            "quizzes",
            "--subject",
            "M136",
            "--student-id",
            "17690579",
            "--password",
            "hunter2",
        ]);

        let shown = format!("{:?}", args.command);
        assert!(shown.contains("17690579"));
        assert!(shown.contains("<redacted>"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn test_session_cookie_is_not_logged() {
        let args = Args::parse_from([
            "timetable-extractor",
            "timetable",
            "--period",
            "2016 Semester 1",
            "--session-cookie",
            "ASP.NET_SessionId=s3cr3t",
        ]);

        let shown = format!("{:?}", args);
        assert!(shown.contains("2016 Semester 1"));
        assert!(!shown.contains("s3cr3t"));
    }
}
