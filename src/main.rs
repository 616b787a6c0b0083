use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use talentsync::adapters::{
    AnalysisService, FaceAdapter, LlmClient, LlmSettings, NullFaceDetector, SilentRecognizer,
    SpeechAdapter, VoiceAdapter,
};
use talentsync::interviews::{
    CsvColumns, InterviewService, JsonStore, ListQuery, LocalInterviews, RemoteInterviews,
};
use talentsync::media::ReplayDevices;
use talentsync::signaling::{forward_session_events, SignalingClient, SignalingSettings};
use talentsync::{create_router, AppState, AuthSession, Config, ConfigStore, SessionCapabilities, SessionManager};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "talentsync", version, about = "Interview session gateway")]
struct Cli {
    /// Config file path, without extension
    #[arg(long, default_value = "config/talentsync")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP control API (default)
    Serve {
        /// Relay session events to this interview's signaling channel
        #[arg(long)]
        interview: Option<String>,
    },
    /// Write every interview as CSV
    ExportCsv {
        /// Add the candidate phone column
        #[arg(long)]
        with_phone: bool,

        /// Output file; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    let auth = Arc::new(match &cfg.api.token {
        Some(token) => AuthSession::with_token(token.clone()),
        None => AuthSession::new(),
    });
    let interviews = interview_service(&cfg, Arc::clone(&auth))?;

    match cli.command.unwrap_or(Command::Serve { interview: None }) {
        Command::Serve { interview } => serve(cfg, auth, interviews, interview).await,
        Command::ExportCsv { with_phone, output } => {
            let columns = if with_phone {
                CsvColumns::WithPhone
            } else {
                CsvColumns::Standard
            };
            let csv = interviews.export_csv(&ListQuery::default(), columns).await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, csv)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Exported interviews to {}", path.display());
                }
                None => println!("{}", csv),
            }
            Ok(())
        }
    }
}

fn interview_service(cfg: &Config, auth: Arc<AuthSession>) -> Result<InterviewService> {
    let local = LocalInterviews::new(JsonStore::new(&cfg.storage.data_dir));
    if cfg.api.offline {
        return Ok(InterviewService::offline(local));
    }

    let remote = RemoteInterviews::new(&cfg.api.base_url(), cfg.api.timeout(), auth)
        .context("Failed to build interview API client")?;
    Ok(InterviewService::new(Some(remote), local))
}

fn analysis_service(cfg: &Config, auth: Arc<AuthSession>) -> Result<AnalysisService> {
    if cfg.api.offline || !cfg.llm.enabled {
        return Ok(AnalysisService::offline());
    }

    let timeout = Duration::from_secs(cfg.llm.timeout_secs);
    let settings = LlmSettings {
        model: cfg.llm.model.clone(),
        max_tokens: cfg.llm.max_tokens,
        timeout,
    };
    let client = LlmClient::new(&cfg.api.base_url(), settings, auth)
        .context("Failed to build analysis client")?;
    Ok(AnalysisService::new(Arc::new(client), timeout))
}

async fn serve(
    cfg: Config,
    auth: Arc<AuthSession>,
    interviews: InterviewService,
    interview: Option<String>,
) -> Result<()> {
    info!("TalentSync v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    let mut session_config = cfg.session_config();

    let runtime = ConfigStore::new();
    if !cfg.api.offline {
        let http = reqwest::Client::builder().timeout(cfg.api.timeout()).build()?;
        if runtime.load_remote(&http, &cfg.api.base_url()).await.is_ok() {
            session_config.max_duration = Duration::from_secs(
                runtime.get_or("features.interviews.maxDuration", cfg.interview.max_duration_secs),
            );
        }
    }
    let validation = runtime.validate();
    if !validation.is_valid {
        warn!("Runtime configuration incomplete: {}", validation.errors.join(", "));
    }

    let capabilities = SessionCapabilities {
        devices: Arc::new(ReplayDevices {
            audio_path: cfg.capture.audio_file.clone(),
            realtime: cfg.capture.realtime,
        }),
        face: FaceAdapter::new(Box::new(NullFaceDetector), session_config.max_consecutive_no_face),
        voice: VoiceAdapter::new(session_config.recording_target()),
        speech: SpeechAdapter::new(Box::<SilentRecognizer>::default()),
        analysis: analysis_service(&cfg, Arc::clone(&auth))?,
    };
    let session = SessionManager::new(session_config, capabilities);

    let signaling = match (&interview, cfg.signaling.enabled) {
        (Some(interview_id), true) => {
            let client = Arc::new(SignalingClient::new(SignalingSettings::from(&cfg.signaling)));
            client.connect(interview_id).await;
            tokio::spawn(forward_session_events(Arc::clone(&client), session.subscribe()));
            Some(client)
        }
        (Some(_), false) => {
            warn!("--interview given but signaling is disabled in config");
            None
        }
        _ => None,
    };

    let app = create_router(AppState::new(session, interviews));
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    if let Some(client) = signaling {
        client.disconnect().await;
    }
    Ok(())
}
