use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use hiring_pipeline::config::AppConfig;
use hiring_pipeline::error::AppError;
use hiring_pipeline::telemetry;
use hiring_pipeline::workflows::recruitment::intake::{
    extract_fields, CandidateDocument, DocumentTextExtractor,
};
use hiring_pipeline::workflows::recruitment::matching::assess;
use tracing::info;

use crate::demo::{run_demo, DemoArgs};
use crate::infra::split_skills;

#[derive(Parser, Debug)]
#[command(
    name = "Hiring Pipeline",
    about = "Parse CVs, score candidates, and walk through a hiring round from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract contact details and skills from a PDF or Word CV
    Parse(ParseArgs),
    /// Score a candidate skill list against a posting's required skills
    Score(ScoreArgs),
    /// Run an end-to-end hiring round against the in-memory store
    Demo(DemoArgs),
}

#[derive(Args, Debug)]
pub(crate) struct ParseArgs {
    /// Path to the CV (PDF or DOCX; the content decides, not the extension)
    pub(crate) path: PathBuf,
    /// Comma-separated required skills to score the CV against
    #[arg(long)]
    pub(crate) required: Option<String>,
    /// Print the extracted fields as JSON
    #[arg(long)]
    pub(crate) json: bool,
    /// Also print the raw extracted text
    #[arg(long)]
    pub(crate) show_text: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Comma-separated candidate skills
    #[arg(long)]
    pub(crate) candidate: String,
    /// Comma-separated required skills
    #[arg(long)]
    pub(crate) required: String,
    /// Print the report as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    info!(environment = ?config.environment, "hiring pipeline starting");

    match cli.command {
        Command::Parse(args) => run_parse(args, &config),
        Command::Score(args) => run_score(args),
        Command::Demo(args) => run_demo(args, &config).await,
    }
}

fn run_parse(args: ParseArgs, config: &AppConfig) -> Result<(), AppError> {
    let bytes = fs::read(&args.path)?;
    let file_name = args
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.path.display().to_string());
    let mut document = CandidateDocument::new(file_name, bytes);
    if let Some(guess) = mime_guess::from_path(&args.path).first() {
        document = document.with_media_type(guess.essence_str());
    }

    let extractor = DocumentTextExtractor::from_config(&config.pipeline);
    let extracted = extractor.extract(&document)?;
    let fields = extract_fields(&extracted.text);
    let report = args
        .required
        .as_deref()
        .map(|required| assess(&fields.skills, &split_skills(required)));

    if args.json {
        let payload = serde_json::json!({
            "file": document.file_name,
            "media_type": extracted.kind.essence(),
            "fields": fields,
            "match": report,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("{} ({})", document.file_name, extracted.kind.essence());
    println!("- name:   {}", fields.name.as_deref().unwrap_or("-"));
    println!("- email:  {}", fields.email.as_deref().unwrap_or("-"));
    println!("- phone:  {}", fields.phone.as_deref().unwrap_or("-"));
    if fields.skills.is_empty() {
        println!("- skills: -");
    } else {
        println!("- skills: {}", fields.skills.join(", "));
    }
    if let Some(report) = report {
        println!(
            "- match:  {} (matched: {}; missing: {})",
            report.score,
            list_or_dash(&report.matched),
            list_or_dash(&report.missing)
        );
    }
    if args.show_text {
        println!("\n{}", extracted.text);
    }
    Ok(())
}

fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let report = assess(&split_skills(&args.candidate), &split_skills(&args.required));
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Match score: {}", report.score);
        println!("- matched: {}", list_or_dash(&report.matched));
        println!("- missing: {}", list_or_dash(&report.missing));
    }
    Ok(())
}

fn list_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}
