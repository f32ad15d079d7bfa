use crate::infra::load_rule_seed;
use crate::server;
use clap::{Args, Parser, Subcommand};
use practicum_eligibility::error::AppError;
use practicum_eligibility::workflows::eligibility::EligibilityError;
use practicum_eligibility::workflows::roster::{parse_roster, RosterRow};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Practicum Eligibility",
    about = "Run the practicum curricular-eligibility service and inspect its inputs",
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
    /// Work with local copies of the roster export
    Roster {
        #[command(subcommand)]
        command: RosterCommand,
    },
    /// Validate eligibility rule seed files
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
}

#[derive(Subcommand, Debug)]
enum RosterCommand {
    /// Parse a roster export and list the candidates it would produce
    Inspect(RosterInspectArgs),
}

#[derive(Subcommand, Debug)]
enum RulesCommand {
    /// Validate every rule in a JSON seed file
    Check(RulesCheckArgs),
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
pub(crate) struct RosterInspectArgs {
    /// Roster export, as a workbook or CSV
    #[arg(long)]
    pub(crate) file: PathBuf,
    /// Keep only candidates nominated for this program code
    #[arg(long)]
    pub(crate) program: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct RulesCheckArgs {
    /// JSON array of rule drafts
    #[arg(long)]
    pub(crate) file: PathBuf,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Roster {
            command: RosterCommand::Inspect(args),
        } => run_roster_inspect(args),
        Command::Rules {
            command: RulesCommand::Check(args),
        } => run_rules_check(args),
    }
}

fn run_roster_inspect(args: RosterInspectArgs) -> Result<(), AppError> {
    let bytes = std::fs::read(&args.file)?;
    let rows = parse_roster(&bytes, args.program.as_deref()).map_err(EligibilityError::from)?;

    println!("{}", render_roster(&rows, args.program.as_deref()));
    Ok(())
}

fn run_rules_check(args: RulesCheckArgs) -> Result<(), AppError> {
    let rules = load_rule_seed(&args.file)?;

    println!("{} rule(s) valid in {}", rules.len(), args.file.display());
    for rule in &rules {
        let programs = if rule.programs.is_empty() {
            "all programs".to_string()
        } else {
            rule.programs.join(", ")
        };
        println!(
            "  - {} [{}] period {} ({} condition(s), {})",
            rule.name,
            rule.id.0,
            rule.period_id,
            rule.conditions.len(),
            programs
        );
    }
    Ok(())
}

fn render_roster(rows: &[RosterRow], program: Option<&str>) -> String {
    let mut out = match program {
        Some(code) => format!("{} candidate(s) nominated for {}\n", rows.len(), code),
        None => format!("{} candidate(s) in roster\n", rows.len()),
    };

    for row in rows {
        let email = row.normalized_email().unwrap_or_else(|| "-".to_string());
        let campus = row.campus.as_deref().unwrap_or("-");
        out.push_str(&format!(
            "  {:<14} {:<8} {:<32} {:<28} {}\n",
            row.identification,
            row.program_code,
            row.full_name(),
            email,
            campus
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_to_serve() {
        let cli = Cli::try_parse_from(["practicum-eligibility"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn roster_inspect_accepts_program_filter() {
        let cli = Cli::try_parse_from([
            "practicum-eligibility",
            "roster",
            "inspect",
            "--file",
            "practicas.csv",
            "--program",
            "AE02",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Roster {
                command: RosterCommand::Inspect(args),
            }) => {
                assert_eq!(args.file, PathBuf::from("practicas.csv"));
                assert_eq!(args.program.as_deref(), Some("AE02"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rendered_roster_lists_each_candidate() {
        let roster = ",,,,\n\
Identificación,Nombres,Apellidos,Código Programa,Correo\n\
123,Ana María,Rojas,AE02,Ana@Uni.edu.co\n\
456,Luis,Pérez,IQ01,\n";
        let rows = parse_roster(roster.as_bytes(), Some("AE02")).expect("parses");

        let rendered = render_roster(&rows, Some("AE02"));

        assert!(rendered.starts_with("1 candidate(s) nominated for AE02"));
        assert!(rendered.contains("Ana María Rojas"));
        assert!(rendered.contains("ana@uni.edu.co"));
        assert!(!rendered.contains("456"));
    }
}
