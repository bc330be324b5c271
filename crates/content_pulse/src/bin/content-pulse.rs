use std::{net::SocketAddr, path::PathBuf, str::FromStr};

use anyhow::Context;
use apalis::{
    layers::{retry::RetryPolicy, sentry::SentryLayer},
    prelude::*,
};
use apalis_cron::{CronStream, Tick};
use clap::{ArgGroup, Parser, Subcommand};
use content_queue::{KvQueueStore, MemoryQueueStore, Queue, QueueBackend, MAX_ATTEMPTS};
use cron::Schedule;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use content_pulse::{
    anthropic::AnthropicClient,
    discovery::{Discovery, DiscoverySource, WatchTarget},
    gemini::GeminiClient,
    media::{cloudinary::CloudinaryClient, kie::KieClient},
    orchestrator::{Orchestrator, OrchestratorSettings},
    server::{self, AppState},
    social::{
        blotato::{parse_accounts, BlotatoClient},
        schedule::PostingSchedule,
    },
    tracing::init_tracing_subscriber,
    yt::{
        data_api::YouTubeDataApi,
        transcript::{FallbackTranscripts, InvidiousTranscripts, WatchPageTranscripts},
    },
    ContentPipeline, ContentPipelineBuilder,
};

type Pipeline = ContentPipeline<
    FallbackTranscripts<WatchPageTranscripts, InvidiousTranscripts>,
    GeminiClient,
    AnthropicClient,
    KieClient,
    Option<CloudinaryClient>,
>;

type Runner = Orchestrator<QueueBackend, Pipeline, Option<BlotatoClient>>;

type ServerState = AppState<YouTubeDataApi, QueueBackend, Pipeline, Option<BlotatoClient>>;

#[derive(Parser)]
#[command(
    name = "content-pulse",
    about = "Turns YouTube videos into LinkedIn posts, newsletters and infographics"
)]
struct Cli {
    /// YouTube Data API v3 key, used for discovery
    #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    youtube_api_key: Option<String>,

    /// Gemini API key, used for the summary and the infographic brief
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL", default_value = GeminiClient::DEFAULT_MODEL)]
    gemini_model: String,

    /// Anthropic API key, used for the post and the newsletter
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_api_key: Option<String>,

    #[arg(long, env = "CLAUDE_MODEL", default_value = AnthropicClient::DEFAULT_MODEL)]
    claude_model: String,

    /// Kie.ai API key, used for image generation
    #[arg(long, env = "KIE_API_KEY", hide_env_values = true)]
    kie_api_key: Option<String>,

    #[arg(long, env = "CLOUDINARY_CLOUD_NAME")]
    cloudinary_cloud_name: Option<String>,

    #[arg(long, env = "CLOUDINARY_API_KEY", hide_env_values = true)]
    cloudinary_api_key: Option<String>,

    #[arg(long, env = "CLOUDINARY_API_SECRET", hide_env_values = true)]
    cloudinary_api_secret: Option<String>,

    /// Blotato API key, posting is disabled without it
    #[arg(long, env = "BLOTATO_API_KEY", hide_env_values = true)]
    blotato_api_key: Option<String>,

    /// Account used when a client has no entry in BLOTATO_ACCOUNTS
    #[arg(long, env = "BLOTATO_ACCOUNT_ID")]
    blotato_account_id: Option<String>,

    /// Per client accounts, `client=account,...`
    #[arg(long, env = "BLOTATO_ACCOUNTS", default_value = "")]
    blotato_accounts: String,

    #[arg(long, env = "KV_REST_API_URL")]
    kv_rest_api_url: Option<String>,

    #[arg(long, env = "KV_REST_API_TOKEN", hide_env_values = true)]
    kv_rest_api_token: Option<String>,

    /// Bearer token expected by the cron endpoints
    #[arg(long, env = "CRON_SECRET", hide_env_values = true)]
    cron_secret: Option<String>,

    /// Comma separated channel ids, each optionally prefixed with `client:`
    #[arg(long, env = "WATCHED_CHANNELS", default_value = "")]
    watched_channels: String,

    #[arg(long, env = "WATCHED_PLAYLISTS", default_value = "")]
    watched_playlists: String,

    #[arg(long, env = "WATCHED_QUERIES", default_value = "")]
    watched_queries: String,

    #[arg(long, env = "MAX_RESULTS_PER_SOURCE", default_value = "5")]
    max_results_per_source: usize,

    #[arg(long, env = "DEFAULT_CLIENT", default_value = "default")]
    default_client: String,

    /// Only process entries that were approved
    #[arg(long, env = "REQUIRE_APPROVAL")]
    require_approval: bool,

    /// IANA timezone of the daily posting slot, posts go out immediately
    /// when unset
    #[arg(long, env = "POST_TIMEZONE")]
    post_timezone: Option<String>,

    #[arg(long, env = "POST_HOUR", default_value = "9")]
    post_hour: u32,

    #[arg(long, env = "OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    #[arg(long, env = "INVIDIOUS_URL", default_value = InvidiousTranscripts::DEFAULT_INSTANCE)]
    invidious_url: String,

    /// Proxy for the YouTube watch page requests
    #[arg(long, env = "PROXY_URL", hide_env_values = true)]
    proxy_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate content for one video
    Run {
        url: String,
        /// Publish the LinkedIn post once generated
        #[arg(long)]
        post: bool,
        #[arg(long)]
        client: Option<String>,
    },
    /// List new videos of a channel, a playlist or a search
    #[command(group(ArgGroup::new("source").required(true).args(["channel", "playlist", "query"])))]
    Discover {
        #[arg(long)]
        channel: Option<String>,
        #[arg(long)]
        playlist: Option<String>,
        #[arg(long)]
        query: Option<String>,
        #[arg(long, default_value = "5")]
        max: usize,
        /// Queue what was found
        #[arg(long)]
        enqueue: bool,
        #[arg(long)]
        client: Option<String>,
    },
    /// Discover and queue new videos from every watched source
    AutoDiscover,
    /// Process the next eligible queue entry
    ProcessNext,
    /// Approve a queued video
    Approve { video_id: String },
    /// Print the queue and the history
    Queue,
    /// Serve the HTTP API and run the scheduled jobs
    Serve {
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
        bind: SocketAddr,
        #[arg(long, env = "DISCOVER_SCHEDULE", default_value = "0 0 */6 * * *")]
        discover_schedule: String,
        #[arg(long, env = "PROCESS_SCHEDULE", default_value = "0 30 8 * * *")]
        process_schedule: String,
    },
}

fn require<'a>(value: &'a Option<String>, name: &str) -> anyhow::Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .with_context(|| format!("{name} not set"))
}

impl Cli {
    fn queue(&self) -> Queue<QueueBackend> {
        let backend = match (
            require(&self.kv_rest_api_url, "KV_REST_API_URL"),
            require(&self.kv_rest_api_token, "KV_REST_API_TOKEN"),
        ) {
            (Ok(url), Ok(token)) => QueueBackend::Kv(KvQueueStore::new(url, token)),
            _ => {
                tracing::warn!("KV credentials not set, the queue will not survive a restart");
                QueueBackend::Memory(MemoryQueueStore::new())
            }
        };
        tracing::info!(backend = backend.name(), "Queue backend selected");

        Queue::new(backend)
    }

    fn lister(&self) -> anyhow::Result<YouTubeDataApi> {
        let key = require(&self.youtube_api_key, "YOUTUBE_API_KEY")?;
        Ok(YouTubeDataApi::new(key))
    }

    fn watch_list(&self) -> Vec<WatchTarget> {
        WatchTarget::watch_list(
            &self.watched_channels,
            &self.watched_playlists,
            &self.watched_queries,
            &self.default_client,
        )
    }

    fn pipeline(&self) -> anyhow::Result<Pipeline> {
        let mut watch_page = WatchPageTranscripts::new();
        if let Ok(proxy) = require(&self.proxy_url, "PROXY_URL") {
            watch_page = watch_page
                .with_proxy(proxy)
                .context("Invalid PROXY_URL")?;
        }
        let transcripts =
            FallbackTranscripts::new(watch_page, InvidiousTranscripts::new(&self.invidious_url));

        let gemini = GeminiClient::new(
            require(&self.gemini_api_key, "GEMINI_API_KEY")?,
            &self.gemini_model,
        );
        let anthropic = AnthropicClient::new(
            require(&self.anthropic_api_key, "ANTHROPIC_API_KEY")?,
            &self.claude_model,
        );
        let kie = KieClient::new(require(&self.kie_api_key, "KIE_API_KEY")?);

        let cloudinary = match (
            require(&self.cloudinary_cloud_name, "CLOUDINARY_CLOUD_NAME"),
            require(&self.cloudinary_api_key, "CLOUDINARY_API_KEY"),
            require(&self.cloudinary_api_secret, "CLOUDINARY_API_SECRET"),
        ) {
            (Ok(cloud), Ok(key), Ok(secret)) => Some(CloudinaryClient::new(cloud, key, secret)),
            _ => {
                tracing::warn!("Cloudinary not configured, posting the generator's image url");
                None
            }
        };

        Ok(ContentPipelineBuilder::new(&self.output_dir)
            .transcripts(transcripts)
            .summarizer(gemini)
            .copywriter(anthropic)
            .image_generator(kie)
            .media_host(cloudinary)
            .build())
    }

    fn publisher(&self) -> Option<BlotatoClient> {
        let key = require(&self.blotato_api_key, "BLOTATO_API_KEY").ok()?;

        Some(
            BlotatoClient::new(key)
                .with_default_account(self.blotato_account_id.clone().unwrap_or_default())
                .with_accounts(parse_accounts(&self.blotato_accounts)),
        )
    }

    fn settings(&self) -> anyhow::Result<OrchestratorSettings> {
        let schedule = match require(&self.post_timezone, "POST_TIMEZONE") {
            Ok(tz) => Some(PostingSchedule::new(tz, self.post_hour)?),
            Err(_) => None,
        };

        Ok(OrchestratorSettings {
            require_approval: self.require_approval,
            default_client: self.default_client.clone(),
            schedule,
        })
    }

    fn runner(&self, queue: Queue<QueueBackend>) -> anyhow::Result<Runner> {
        Ok(Orchestrator::new(
            queue,
            self.pipeline()?,
            self.publisher(),
            self.settings()?,
        ))
    }

    fn discovery(
        &self,
        queue: Queue<QueueBackend>,
    ) -> anyhow::Result<Discovery<YouTubeDataApi, QueueBackend>> {
        Ok(Discovery::new(self.lister()?, queue)
            .with_watch_list(self.watch_list(), self.max_results_per_source))
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn handle_discover_tick(_tick: Tick, state: Data<ServerState>) -> anyhow::Result<()> {
    tracing::info!(
        sources = state.discovery.watch_list().len(),
        "Running scheduled discovery..."
    );
    state.discovery.auto_discover().await?;
    Ok(())
}

async fn handle_process_tick(_tick: Tick, state: Data<ServerState>) -> anyhow::Result<()> {
    tracing::info!("Running scheduled processing...");
    state.orchestrator.process_next().await?;
    Ok(())
}

async fn serve(
    cli: &Cli,
    bind: SocketAddr,
    discover_schedule: &str,
    process_schedule: &str,
) -> anyhow::Result<()> {
    let queue = cli.queue();
    let state = AppState::new(
        cli.discovery(queue.clone())?,
        cli.runner(queue)?,
        cli.cron_secret.clone(),
    );

    let discover_schedule =
        Schedule::from_str(discover_schedule).context("Invalid DISCOVER_SCHEDULE")?;
    let process_schedule =
        Schedule::from_str(process_schedule).context("Invalid PROCESS_SCHEDULE")?;

    let discover_worker = WorkerBuilder::new("content-pulse-discover")
        .backend(CronStream::new(discover_schedule))
        .layer(SentryLayer::new())
        .data(state.clone())
        .build(handle_discover_tick);

    // a retry reruns process_next, entries are skipped after MAX_ATTEMPTS failures
    let process_worker = WorkerBuilder::new("content-pulse-process")
        .backend(CronStream::new(process_schedule))
        .retry(RetryPolicy::retries(MAX_ATTEMPTS as usize))
        .layer(SentryLayer::new())
        .data(state.clone())
        .build(handle_process_tick);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutting down...");
            }
            shutdown.cancel();
        }
    });

    let app = server::router(state);

    tokio::select! {
        res = server::serve(app, bind, shutdown.clone()) => res?,
        res = discover_worker.run() => res?,
        res = process_worker.run() => res?,
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some("production".into()),
            ..Default::default()
        },
    ));

    let cli = Cli::parse();
    init_tracing_subscriber()?;

    match &cli.command {
        Command::Run { url, post, client } => {
            let runner = cli.runner(cli.queue())?;
            let artifacts = runner.generate(url).await?;
            tracing::info!(dir = %artifacts.output_dir.display(), "Content generated");
            print_json(&artifacts.result_document())?;

            if *post {
                let receipt = runner
                    .post_custom(
                        &artifacts.linkedin_post,
                        &artifacts.image.hosted_url,
                        client.as_deref(),
                    )
                    .await?;
                print_json(&receipt)?;
            }
        }
        Command::Discover {
            channel,
            playlist,
            query,
            max,
            enqueue,
            client,
        } => {
            let source = match (channel, playlist, query) {
                (Some(id), _, _) => DiscoverySource::Channel(id.clone()),
                (_, Some(id), _) => DiscoverySource::Playlist(id.clone()),
                (_, _, Some(q)) => DiscoverySource::Search(q.clone()),
                _ => anyhow::bail!("One of --channel, --playlist or --query is required"),
            };

            let discovery = cli.discovery(cli.queue())?;
            let videos = if *enqueue {
                let client = client.as_deref().unwrap_or(cli.default_client.as_str());
                discovery.discover_and_enqueue(&source, *max, client).await?
            } else {
                discovery.discover_new(&source, *max).await?
            };
            print_json(&videos)?;
        }
        Command::AutoDiscover => {
            let report = cli.discovery(cli.queue())?.auto_discover().await?;
            print_json(&report)?;
        }
        Command::ProcessNext => {
            let outcome = cli.runner(cli.queue())?.process_next().await?;
            print_json(&outcome)?;
        }
        Command::Approve { video_id } => {
            let entry = cli
                .queue()
                .approve(video_id)
                .await?
                .with_context(|| format!("{video_id} is not queued"))?;
            print_json(&entry)?;
        }
        Command::Queue => {
            let snapshot = cli.queue().snapshot().await?;
            print_json(&snapshot)?;
        }
        Command::Serve {
            bind,
            discover_schedule,
            process_schedule,
        } => {
            tracing::info!(%bind, %discover_schedule, %process_schedule, "Starting server and scheduler...");
            serve(&cli, *bind, discover_schedule, process_schedule).await?;
        }
    }

    Ok(())
}
