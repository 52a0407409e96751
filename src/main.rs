use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use doe::api::create_router;
use doe::auth::{CachedTokenProvider, CommandTokenProvider, TokenProvider};
use doe::chat::ChatSession;
use doe::client::ProxyClient;
use doe::config::Config;
use doe::discovery::DiscoveryEngineClient;
use doe::proxy::SearchProxy;
use doe::render::{render_answer, render_message, render_transcript};

#[derive(Parser)]
#[command(name = "doe", about = "DOE search proxy and terminal chat client")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the Discovery Engine proxy (default)
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Interactive chat against a running proxy
    Chat {
        #[arg(long)]
        api_url: Option<String>,
    },
    /// Send one query and print the transcript
    Ask {
        query: String,
        #[arg(long)]
        api_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    let config = &config;

    // Logs go to stderr so the chat transcript owns stdout
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(config, port).await,
        Command::Chat { api_url } => chat(api_url.as_deref().unwrap_or(&config.api_url)).await,
        Command::Ask { query, api_url } => {
            let client = ProxyClient::new(api_url.as_deref().unwrap_or(&config.api_url));
            let mut session = ChatSession::new(client);
            session.send(&query).await;
            print!("{}", render_transcript(session.state().messages()));
            Ok(())
        }
    }
}

fn token_provider(config: &Config) -> anyhow::Result<Arc<dyn TokenProvider>> {
    let (program, args) = config.token_command_parts()?;
    let command = CommandTokenProvider::new(program, args);
    if config.token_cache_ttl.is_zero() {
        return Ok(Arc::new(command));
    }
    log::info!(
        "caching access tokens for {}s",
        config.token_cache_ttl.as_secs()
    );
    Ok(Arc::new(CachedTokenProvider::new(
        command,
        config.token_cache_ttl,
    )))
}

async fn serve(config: &Config, port: Option<u16>) -> anyhow::Result<()> {
    let engine = DiscoveryEngineClient::new(&config.discovery_endpoint, &config.serving_config);
    let proxy = Arc::new(SearchProxy::new(token_provider(config)?, engine));
    log::info!("proxying to {}", proxy.engine().serving_config_url());

    let app = create_router(proxy, &config.static_dir);

    let addr = match port {
        Some(port) => format!("{}:{port}", config.bind_host),
        None => config.bind_addr(),
    };
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    log::info!("server running on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn chat(api_url: &str) -> anyhow::Result<()> {
    let mut session = ChatSession::new(ProxyClient::new(api_url));
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let banner = format!(
        "Ask DOE anything... (proxy {}; /answer follows up on the last search, /quit exits)\n",
        session.client().base_url()
    );
    stdout.write_all(banner.as_bytes()).await?;
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/answer" => {
                let out = match session.last_session() {
                    Some((query_id, session_id)) => {
                        match session.client().generate_answer(query_id, session_id).await {
                            Ok(answer) => render_answer(&answer),
                            Err(e) => format!("  (Error generating answer: {e})\n"),
                        }
                    }
                    None => "  (no search session to follow up on yet)\n".to_string(),
                };
                stdout.write_all(out.as_bytes()).await?;
            }
            query => {
                let appended = session.send(query).await;
                let messages = session.state().messages();
                // The user's own line is already on screen.
                for message in messages[messages.len() - appended..].iter().skip(1) {
                    stdout.write_all(render_message(message).as_bytes()).await?;
                }
            }
        }
    }
    Ok(())
}
