use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use clap::Args;
use hiring_pipeline::config::AppConfig;
use hiring_pipeline::error::AppError;
use hiring_pipeline::workflows::recruitment::applications::ApplicationSource;
use hiring_pipeline::workflows::recruitment::intake::CandidateDocument;
use hiring_pipeline::workflows::recruitment::interviews::{
    Evaluation, InterviewPlan, InterviewType, Interviewer, LocationMode, Recommendation,
};
use hiring_pipeline::workflows::recruitment::memory::InMemoryStore;
use hiring_pipeline::workflows::recruitment::policy::Lifecycle;
use hiring_pipeline::workflows::recruitment::postings::{ContractType, PostingDraft};
use hiring_pipeline::workflows::recruitment::{
    Actor, ActorRole, ApplicationService, ApplicationStatus, ApplicationSubmission,
    InterviewService, InterviewStatus, PostingService, RecruitmentError,
};

use crate::infra::{spawn_delivery_worker, split_skills, ChannelNotifier};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// CV (PDF or DOCX) to submit for the first candidate instead of declared skills only.
    #[arg(long)]
    pub(crate) cv: Option<PathBuf>,
    /// Comma-separated required skills for the demo posting.
    #[arg(long, default_value = "Java,React,MongoDB")]
    pub(crate) required: String,
    /// Interview start (RFC 3339 or `YYYY-MM-DD HH:MM`, UTC). Defaults to tomorrow.
    #[arg(long, value_parser = crate::infra::parse_datetime)]
    pub(crate) interview_at: Option<DateTime<Utc>>,
    /// Stop after the applications have been submitted.
    #[arg(long)]
    pub(crate) skip_interview: bool,
}

pub(crate) async fn run_demo(args: DemoArgs, config: &AppConfig) -> Result<(), AppError> {
    let (notifier, receiver) = ChannelNotifier::new();
    let worker = spawn_delivery_worker(receiver);

    // Services own the notifier; dropping them closes the channel and lets the worker finish.
    {
        let store = Arc::new(InMemoryStore::default());
        let notifier = Arc::new(notifier);
        let postings = PostingService::new(store.clone(), &config.pipeline);
        let applications =
            ApplicationService::new(store.clone(), notifier.clone(), &config.pipeline);
        let interviews = InterviewService::new(store, notifier);
        hiring_round(&args, &postings, &applications, &interviews)?;
    }

    let delivered = worker.await.unwrap_or_default();
    println!("\nNotifications delivered: {}", delivered.len());
    for event in &delivered {
        println!(
            "  - {} -> {} ({})",
            event.template(),
            event.recipient().email,
            event.entity_id()
        );
    }
    Ok(())
}

fn hiring_round(
    args: &DemoArgs,
    postings: &PostingService<InMemoryStore>,
    applications: &ApplicationService<InMemoryStore, ChannelNotifier>,
    interviews: &InterviewService<InMemoryStore, ChannelNotifier>,
) -> Result<(), AppError> {
    let recruiter = Actor::new("recruiter-1", "Rita Recruiter", ActorRole::Recruiter);
    let interviewer = Actor::new("lead-1", "Lee Lead", ActorRole::Interviewer);
    let now = Utc::now();

    println!("Hiring pipeline demo");
    let posting = postings.create(
        &recruiter,
        PostingDraft {
            title: "Full-stack developer".to_string(),
            description: "Build and run the careers platform".to_string(),
            location: Some("Lyon".to_string()),
            contract_type: ContractType::Cdi,
            experience_years: Some(3),
            remote: true,
            required_skills: split_skills(&args.required),
            desired_skills: vec!["Docker".to_string(), "Kubernetes".to_string()],
            ..PostingDraft::default()
        },
    )?;
    let posting = postings.publish(&recruiter, &posting.id)?;
    println!(
        "- posting {} [{}] {} | required: {} | expires {}",
        posting.reference,
        posting.status.token(),
        posting.title,
        posting.required_skills.join(", "),
        posting
            .expires_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    for _ in 0..3 {
        postings.view(&posting.id)?;
    }

    let mut first = ApplicationSubmission {
        posting_id: posting.id.clone(),
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        email: "jane.doe@example.com".to_string(),
        cover_letter: Some("Happy to help you ship.".to_string()),
        source: ApplicationSource::Linkedin,
        declared_skills: vec!["Java".to_string(), "React".to_string()],
        ..ApplicationSubmission::default()
    };
    if let Some(path) = &args.cv {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cv".to_string());
        let mut document = CandidateDocument::new(file_name, fs::read(path)?);
        if let Some(guess) = mime_guess::from_path(path).first() {
            document = document.with_media_type(guess.essence_str());
        }
        first.document = Some(document);
    }
    let second = ApplicationSubmission {
        posting_id: posting.id.clone(),
        first_name: "John".to_string(),
        last_name: "Roe".to_string(),
        email: "john.roe@example.com".to_string(),
        source: ApplicationSource::Cooptation,
        declared_skills: vec!["Python".to_string(), "MongoDB".to_string()],
        ..ApplicationSubmission::default()
    };

    let jane = applications.submit(first.clone())?;
    let john = applications.submit(second)?;
    for application in [&jane, &john] {
        println!(
            "- application {} from {} scored {}",
            application.id, application.snapshot.candidate_name, application.match_score
        );
    }

    match applications.submit(first) {
        Err(RecruitmentError::DuplicateApplication { .. }) => {
            println!("- duplicate submission from {} rejected", jane.snapshot.candidate_email)
        }
        Err(err) => return Err(err.into()),
        Ok(application) => println!("- unexpected duplicate accepted: {}", application.id),
    }

    applications.add_comment(&recruiter, &jane.id, "Strong React portfolio", true)?;
    applications.change_status(
        &recruiter,
        &john.id,
        ApplicationStatus::Rejected,
        Some("Missing core skills".to_string()),
    )?;

    if !args.skip_interview {
        applications.change_status(&recruiter, &jane.id, ApplicationStatus::Shortlisted, None)?;
        applications.change_status(&recruiter, &jane.id, ApplicationStatus::TechnicalTest, None)?;

        let starts_at = args.interview_at.unwrap_or(now + Duration::days(1));
        let interview = interviews.schedule(
            &recruiter,
            InterviewPlan {
                application_id: jane.id.clone(),
                interview_type: InterviewType::Technical,
                starts_at,
                duration_minutes: Some(90),
                title: None,
                description: Some("Pairing session on the careers API".to_string()),
                location_mode: LocationMode::Video,
                location: Some("https://meet.example.com/careers-api".to_string()),
                room: None,
                interviewers: vec![Interviewer {
                    id: interviewer.id.clone(),
                    name: interviewer.display_name.clone(),
                }],
            },
        )?;
        println!(
            "- interview {} on {} until {}",
            interview.id,
            interview.starts_at().format("%Y-%m-%d %H:%M"),
            interview.ends_at().format("%H:%M")
        );

        let reminded = interviews.send_due_reminders(now + Duration::hours(1))?;
        println!("- reminders sent: {}", reminded.len());

        interviews.change_status(&interviewer, &interview.id, InterviewStatus::Completed)?;
        for (criterion, score) in [("architecture", 4), ("testing", 5), ("communication", 4)] {
            interviews.add_evaluation(&interview.id, Evaluation::new(criterion, score, None)?)?;
        }
        interviews.recommend(
            &interview.id,
            Recommendation::Recommended,
            Some("Solid pairing, clear tests".to_string()),
        )?;
        let evaluated =
            interviews.change_status(&interviewer, &interview.id, InterviewStatus::Evaluated)?;
        println!(
            "- interview evaluated: overall {}",
            evaluated
                .overall_score()
                .map(|score| score.to_string())
                .unwrap_or_else(|| "-".to_string())
        );

        applications.change_status(&recruiter, &jane.id, ApplicationStatus::OfferSent, None)?;
        applications.change_status(&recruiter, &jane.id, ApplicationStatus::Accepted, None)?;
        postings.mark_filled(&recruiter, &posting.id)?;
    }

    let history = applications.get(&jane.id)?;
    println!("\nHistory for {}", history.id);
    for entry in history.history() {
        println!(
            "  {} -> {} by {}{}",
            entry.previous.map(|status| status.token()).unwrap_or("-"),
            entry.new.token(),
            entry.author_name,
            entry
                .comment
                .as_deref()
                .map(|comment| format!(" ({comment})"))
                .unwrap_or_default()
        );
    }

    let stats = postings.stats(&posting.id, Utc::now())?;
    println!(
        "\nPosting stats: {} views | {} applications | {:.1}% conversion",
        stats.view_count, stats.application_count, stats.conversion_rate
    );
    let breakdown = applications.status_breakdown(Some(&posting.id))?;
    for (status, count) in breakdown.counts.iter().filter(|(_, count)| **count > 0) {
        println!("  {}: {}", status.token(), count);
    }
    for (source, count) in breakdown.sources.iter().filter(|(_, count)| **count > 0) {
        println!("  via {source:?}: {count}");
    }
    let bands: Vec<String> = breakdown
        .scores
        .iter()
        .map(|(label, count)| format!("{label}: {count}"))
        .collect();
    println!("  match scores | {}", bands.join(" | "));

    let by_status: Vec<String> = postings
        .count_by_status()?
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(status, count)| format!("{} {count}", status.token()))
        .collect();
    println!("Postings: {}", by_status.join(" | "));
    let interview_stats = interviews.stats(Utc::now())?;
    println!(
        "Interviews: {} total | {} today | {} upcoming",
        interview_stats.total, interview_stats.today, interview_stats.upcoming
    );
    Ok(())
}
