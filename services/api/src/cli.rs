use crate::infra::{
    parse_date, parse_direction, parse_gender, parse_outcome, parse_session, parse_sort,
};
use crate::screen::{run_clear, run_report, run_screen, run_status};
use crate::server;
use aml_screening::error::AppError;
use aml_screening::screening::views::{CaseQuery, CaseSortKey, OutcomeFilter, SortDirection};
use aml_screening::screening::{Gender, SessionId, SubjectForm};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "AML Screening",
    about = "Screen individuals and businesses against four AML data sources",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Submit a subject to every screening gateway and wait for the results
    Screen(ScreenArgs),
    /// Show the stored status of a screening session
    Status(SessionArgs),
    /// Render one of the detail reports (1-4) from stored results
    Report(ReportArgs),
    /// Forget the stored subject and results so a new screening can start
    Clear(SessionArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct SessionArgs {
    /// JSON file holding session results between runs
    #[arg(long, default_value = "aml-session.json")]
    pub(crate) session_file: PathBuf,
    /// Session name inside the file
    #[arg(long, default_value = "local", value_parser = parse_session)]
    pub(crate) session: SessionId,
}

#[derive(Args, Debug)]
pub(crate) struct ScreenArgs {
    #[command(flatten)]
    pub(crate) session: SessionArgs,
    /// Registry number or personal code stored alongside the subject
    #[arg(long)]
    pub(crate) identifier: Option<String>,
    #[command(subcommand)]
    pub(crate) subject: SubjectCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum SubjectCommand {
    /// Screen a natural person
    Individual(IndividualArgs),
    /// Screen a company under one or more names
    Business(BusinessArgs),
}

#[derive(Args, Debug)]
pub(crate) struct IndividualArgs {
    #[arg(long)]
    pub(crate) first_name: String,
    #[arg(long)]
    pub(crate) middle_name: Option<String>,
    #[arg(long)]
    pub(crate) last_name: String,
    /// Male or Female (defaults to Male)
    #[arg(long, value_parser = parse_gender)]
    pub(crate) gender: Option<Gender>,
    /// Date of birth (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub(crate) date_of_birth: Option<NaiveDate>,
    /// Two-letter country code
    #[arg(long)]
    pub(crate) place_of_birth: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct BusinessArgs {
    /// Company name; repeat for aliases
    #[arg(long = "company-name", required = true)]
    pub(crate) company_names: Vec<String>,
}

impl ScreenArgs {
    pub(crate) fn subject_form(&self) -> SubjectForm {
        let mut form = match &self.subject {
            SubjectCommand::Individual(person) => {
                let mut form = SubjectForm::individual(&person.first_name, &person.last_name);
                form.middle_name = person.middle_name.clone().unwrap_or_default();
                form.gender = person.gender;
                form.date_of_birth = person.date_of_birth;
                form.place_of_birth = person.place_of_birth.clone().unwrap_or_default();
                form
            }
            SubjectCommand::Business(business) => {
                SubjectForm::business(business.company_names.iter().cloned())
            }
        };
        form.identifier = self.identifier.clone().unwrap_or_default();
        form
    }
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    #[command(flatten)]
    pub(crate) session: SessionArgs,
    /// Report to render: 1 court records, 2 screening, 3 adverse media, 4 Lexis Nexis
    pub(crate) view_id: String,
    /// Filter cases by number or topic (report 1)
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// all, winning or losing (report 1)
    #[arg(long, value_parser = parse_outcome)]
    pub(crate) outcome: Option<OutcomeFilter>,
    /// decision_date or case_topic (report 1)
    #[arg(long, value_parser = parse_sort)]
    pub(crate) sort: Option<CaseSortKey>,
    /// asc or desc (report 1)
    #[arg(long, value_parser = parse_direction)]
    pub(crate) direction: Option<SortDirection>,
}

impl ReportArgs {
    pub(crate) fn case_query(&self) -> CaseQuery {
        CaseQuery {
            search: self.search.clone(),
            outcome: self.outcome.unwrap_or_default(),
            sort: self.sort.unwrap_or_default(),
            direction: self.direction.unwrap_or_default(),
        }
    }
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Screen(args) => run_screen(args).await,
        Command::Status(args) => run_status(args),
        Command::Report(args) => run_report(args),
        Command::Clear(args) => run_clear(args),
    }
}
