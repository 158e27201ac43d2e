use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use client::analysis::{AnalysisRecord, AnalysisSnapshotStore, ScoreBand};
use client::config::Config;
use client::http::ReqwestTransport;
use client::session::{FileCredentialStore, SignOutCause};
use client::{ApiError, Session, SessionClient, SessionState};

#[derive(Parser)]
#[command(name = "ats-client")]
#[command(about = "Sign in, upload resumes, and score them against job descriptions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Email a one-time sign-in code
    RequestOtp {
        #[arg(long)]
        email: String,
    },
    /// Exchange the emailed code for a session
    VerifyOtp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        otp: String,
    },
    /// End the session on the server and on this device
    Logout,
    /// Show whether a session is active and the last saved score
    Status,
    /// Upload a resume (pdf, docx, doc)
    Upload { file: PathBuf },
    /// Download the most recently uploaded resume
    Latest {
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Download the resume file used by the latest analysis
    AnalyzedFile {
        #[arg(long, short)]
        output: PathBuf,
    },
    /// List uploaded resume versions and their analyses
    History,
    /// Extract skills from a job description
    AnalyzeJd(JobDescriptionArgs),
    /// Score the latest resume against a job description
    Score {
        #[command(flatten)]
        job: JobDescriptionArgs,
        /// Print the backend payload instead of the normalized result
        #[arg(long)]
        raw: bool,
    },
    /// Show the last saved analysis
    Results,
}

#[derive(Args)]
struct JobDescriptionArgs {
    /// Job description text
    #[arg(long, conflicts_with = "jd_file", required_unless_present = "jd_file")]
    jd: Option<String>,
    /// File containing the job description
    #[arg(long)]
    jd_file: Option<PathBuf>,
}

impl JobDescriptionArgs {
    async fn read(&self) -> Result<String> {
        match (&self.jd, &self.jd_file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("could not read {}", path.display())),
            (None, None) => bail!("pass --jd or --jd-file"),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("client={0},ats_client={0}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let app = match App::build(&config) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = app.run(cli.command).await;
    let code = match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<ApiError>() {
                Some(api) => eprintln!("{}", api.user_message()),
                None => eprintln!("{e:#}"),
            }
            ExitCode::FAILURE
        }
    };

    if let SessionState::SignedOut(SignOutCause::RefreshUnavailable | SignOutCause::RefreshFailed) =
        app.client.session().state()
    {
        eprintln!("Your session has ended. Sign in again with `ats-client request-otp`.");
    }
    code
}

struct App {
    client: SessionClient,
    snapshots: AnalysisSnapshotStore,
}

impl App {
    fn build(config: &Config) -> Result<Self> {
        let store = FileCredentialStore::in_dir(&config.session_dir)
            .with_context(|| format!("could not open session in {}", config.session_dir.display()))?;
        let session = Session::new(Arc::new(store));
        let transport = ReqwestTransport::new(&config.api_base_url, config.request_timeout)
            .context("could not build HTTP client")?;
        info!(api = %config.api_base_url, "ats-client v{}", env!("CARGO_PKG_VERSION"));

        Ok(App {
            client: SessionClient::new(Arc::new(transport), session),
            snapshots: AnalysisSnapshotStore::in_dir(&config.session_dir),
        })
    }

    async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::RequestOtp { email } => {
                self.client.request_otp(&email).await?;
                println!("A sign-in code was sent to {email}.");
            }
            Commands::VerifyOtp { email, otp } => {
                self.client.verify_otp(&email, &otp).await?;
                println!("Signed in as {email}.");
            }
            Commands::Logout => {
                self.client.logout().await;
                self.snapshots.clear()?;
                println!("Signed out.");
            }
            Commands::Status => self.status()?,
            Commands::Upload { file } => {
                let name = file_name(&file)?;
                let contents = tokio::fs::read(&file)
                    .await
                    .with_context(|| format!("could not read {}", file.display()))?;
                self.client.upload_resume(&name, contents).await?;
                println!("Uploaded {name}.");
            }
            Commands::Latest { output } => match self.client.latest_resume().await? {
                Some(bytes) => write_output(&output, &bytes).await?,
                None => println!("No resume uploaded yet."),
            },
            Commands::AnalyzedFile { output } => {
                let bytes = self.client.latest_analyzed_file().await?;
                write_output(&output, &bytes).await?;
            }
            Commands::History => {
                let history = self.client.resume_history().await?;
                println!("{}", serde_json::to_string_pretty(&history)?);
                if let Some(best) = history.best_score() {
                    println!("Best score: {best:.0}/100 ({})", ScoreBand::for_score(best));
                }
            }
            Commands::AnalyzeJd(job) => {
                let analysis = self.client.analyze_job(&job.read().await?).await?;
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            }
            Commands::Score { job, raw } => {
                let description = job.read().await?;
                if raw {
                    let payload = self.client.score_raw(&description).await?;
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                    return Ok(());
                }
                match self.client.score(&description).await? {
                    Some(record) => {
                        self.snapshots.save(&record)?;
                        print_record(&record);
                    }
                    None => println!("No analysis data was returned."),
                }
            }
            Commands::Results => match self.snapshots.load()? {
                Some(snapshot) => {
                    println!("Saved {}", snapshot.saved_at.format("%Y-%m-%d %H:%M UTC"));
                    print_record(&snapshot.record);
                }
                None => println!("No saved analysis. Run `ats-client score` first."),
            },
        }
        Ok(())
    }

    fn status(&self) -> Result<()> {
        let signed_in = self.client.session().is_authenticated();
        println!("Signed in: {}", if signed_in { "yes" } else { "no" });
        if let Some(snapshot) = self.snapshots.load()? {
            println!(
                "Last score: {:.0} ({}) on {}",
                snapshot.record.score,
                snapshot.record.band(),
                snapshot.saved_at.format("%Y-%m-%d")
            );
        }
        Ok(())
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("{} is not a file path", path.display()))
}

async fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("could not write {}", path.display()))?;
    println!("Saved {} bytes to {}.", bytes.len(), path.display());
    Ok(())
}

fn print_record(record: &AnalysisRecord) {
    println!("ATS score: {:.0}/100 ({})", record.score, record.band());
    for (part, points) in &record.breakdown {
        println!("  {part}: {points}");
    }
    print_list("Matched skills", &record.matched_skills);
    print_list("Weak skills", &record.weak_skills);
    print_list("Missing skills", &record.missing_skills);

    let missing: Vec<&str> = record.missing_sections().collect();
    if !missing.is_empty() {
        println!("Missing sections: {}", missing.join(", "));
    }
    print_list("Experience feedback", &record.experience_feedback);
    print_list("Formatting feedback", &record.formatting_feedback);
    print_list("Suggestions", &record.suggestions);
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{title}:");
    for item in items {
        println!("  - {item}");
    }
}
