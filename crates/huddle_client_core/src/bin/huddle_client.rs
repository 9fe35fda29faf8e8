#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use huddle_client_core::transport::RawStream;
use huddle_client_core::{
	LocalControls, LoopbackTransport, MediaNotification, Session, SessionConfig, SessionSnapshot, SessionView,
	load_session_config, load_session_config_from_path,
};
use huddle_domain::SessionId;
use huddle_util::endpoint::HttpEndpoint;
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing::{info, warn};

fn usage_and_exit() -> ! {
	eprintln!(
		"Usage: huddle_client [--config path] [--session id] [--archive-url http(s)://host[:port]/path]\n\
\n\
Options:\n\
	--config       Config file (default: ~/.huddle/config.toml)\n\
	--session      Session id to join (overrides config and HUDDLE_SESSION_ID)\n\
	--archive-url  Replay archive endpoint (overrides config and HUDDLE_ARCHIVE_URL)\n\
	--help         Show this help\n\
\n\
Commands (stdin):\n\
	/video   Toggle local video publishing\n\
	/clear   Dismiss the current error\n\
	/fail    Simulate a publish failure\n\
	/quit    Leave the session\n\
	<text>   Send a chat line\n\
\n\
Notes:\n\
	Runs against an in-process loopback transport; sent lines come back as echoes.\n"
	);
	std::process::exit(2)
}

fn init_tracing() {
	let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,huddle_client_core=debug".to_string());
	tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

#[derive(Debug, Default)]
struct Args {
	config: Option<PathBuf>,
	session: Option<SessionId>,
	archive_url: Option<HttpEndpoint>,
}

fn parse_args() -> Args {
	let mut args = Args::default();

	let mut it = std::env::args().skip(1);
	while let Some(arg) = it.next() {
		match arg.as_str() {
			"--help" | "-h" => usage_and_exit(),
			"--config" => {
				let v = it.next().unwrap_or_else(|| usage_and_exit());
				if v.trim().is_empty() {
					eprintln!("--config must be non-empty");
					usage_and_exit();
				}
				args.config = Some(PathBuf::from(v));
			}
			"--session" => {
				let v = it.next().unwrap_or_else(|| usage_and_exit());
				let id = SessionId::new(v).unwrap_or_else(|_| {
					eprintln!("--session must be non-empty");
					usage_and_exit()
				});
				args.session = Some(id);
			}
			"--archive-url" => {
				let v = it.next().unwrap_or_else(|| usage_and_exit());
				let endpoint = HttpEndpoint::parse(&v).unwrap_or_else(|e| {
					eprintln!("Invalid --archive-url value: {v}\n{e}");
					usage_and_exit()
				});
				args.archive_url = Some(endpoint);
			}
			other => {
				eprintln!("Unknown argument: {other}");
				usage_and_exit();
			}
		}
	}

	args
}

fn load_config(args: Args) -> anyhow::Result<SessionConfig> {
	let mut cfg = match &args.config {
		Some(path) => load_session_config_from_path(path)?,
		None => load_session_config()?,
	};

	if let Some(id) = args.session {
		cfg.credentials.session_id = id;
	}
	if let Some(url) = args.archive_url {
		cfg.archive.url = Some(url);
	}

	Ok(cfg)
}

fn demo_roster() -> Vec<RawStream> {
	vec![RawStream {
		stream_id: "demo-guest".to_string(),
		name: Some("Demo guest".to_string()),
		..Default::default()
	}]
}

fn render(snapshot: &SessionSnapshot, controls: &LocalControls, cfg: &SessionConfig) {
	print!("{}", SessionView::build(snapshot, controls, &cfg.layout));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	init_tracing();
	let cfg = load_config(parse_args()).context("load session config")?;

	let transport = Arc::new(LoopbackTransport::new());
	let (session, mut updates) = Session::from_config(&cfg, transport.clone()).context("start session")?;
	info!(
		session_id = %session.session_id(),
		connection_id = transport.connection_id(),
		archiving = session.is_archiving(),
		"joined loopback session"
	);

	let composer = session.composer();
	let reporter = session.media_reporter();
	let mut controls = LocalControls::default();
	let mut last = Arc::new(SessionSnapshot::initial());

	transport.emit_lifecycle("sessionConnected");
	transport.emit_roster(demo_roster());
	reporter.report(MediaNotification::PublishSucceeded);

	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	loop {
		tokio::select! {
			update = updates.recv() => {
				let Some(update) = update else { break };
				last = update.snapshot;
				render(&last, &controls, &cfg);
			}
			line = lines.next_line() => {
				let Some(line) = line.context("read stdin")? else { break };
				match line.trim() {
					"/quit" => break,
					"/video" => {
						controls.toggle_video();
						render(&last, &controls, &cfg);
					}
					"/clear" => {
						session.clear_error();
					}
					"/fail" => {
						reporter.report(MediaNotification::PublishFailed {
							message: "simulated publish failure".to_string(),
						});
					}
					_ => {
						composer.set_draft(line.as_str());
						if let Err(e) = composer.submit().await {
							warn!(error = %e, "chat line not sent");
						}
					}
				}
			}
		}
	}

	drop(reporter);
	let final_snapshot = session.teardown().await.context("join session store")?;
	info!(
		messages = final_snapshot.messages().len(),
		version = final_snapshot.version,
		"left session"
	);

	Ok(())
}
