//! CLI binary for devassist.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use devassist::speech::{VoiceParams, synthesizer_from_config};
use devassist::{
    AssistantConfig, ChatSession, ChunkedSpeechPlayer, HttpBackend, ResponseGenerator,
    VoiceSession, VoiceTurn,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// DevAssist: learning and productivity assistant.
#[derive(Parser)]
#[command(name = "devassist", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read replies aloud.
    #[arg(short, long)]
    speak: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Chat with the assistant, one line per message.
    Chat,

    /// Ask a single question and exit.
    Ask {
        /// The question.
        text: Vec<String>,
    },

    /// Treat input lines as a live always-on voice transcript; a line is
    /// acted on once it stays unchanged for the capture pause.
    Listen,

    /// Write the default configuration file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("devassist=info")),
        )
        .init();

    let cli = Cli::parse();
    let path = cli
        .config
        .clone()
        .unwrap_or_else(AssistantConfig::default_config_path);

    if let Some(Command::InitConfig { force }) = cli.command {
        return init_config(&path, force);
    }

    let config = match cli.config {
        Some(ref path) => AssistantConfig::from_file(path)?,
        None => AssistantConfig::load_or_default(&path)?,
    };
    let backend = Arc::new(HttpBackend::from_config(&config.api));
    let generator = Arc::new(ResponseGenerator::from_config(&config, backend));

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => run_chat(&config, generator, cli.speak).await,
        Command::Ask { text } => run_ask(&config, &generator, &text.join(" "), cli.speak).await,
        Command::Listen => run_listen(&config, generator).await,
        Command::InitConfig { .. } => Ok(()),
    }
}

fn init_config(path: &std::path::Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    AssistantConfig::default().save_to_file(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn player(config: &AssistantConfig) -> Arc<ChunkedSpeechPlayer> {
    Arc::new(ChunkedSpeechPlayer::new(
        synthesizer_from_config(&config.speech),
        VoiceParams::from(&config.speech),
    ))
}

fn ctrl_c_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down...");
            cancel_clone.cancel();
        }
    });
    cancel
}

async fn run_ask(
    config: &AssistantConfig,
    generator: &ResponseGenerator,
    text: &str,
    speak: bool,
) -> anyhow::Result<()> {
    let reply = generator.respond_once(text).await;
    println!("{}", reply.text);
    if speak {
        player(config).play(&reply.text).await;
    }
    Ok(())
}

async fn run_chat(
    config: &AssistantConfig,
    generator: Arc<ResponseGenerator>,
    speak: bool,
) -> anyhow::Result<()> {
    println!("DevAssist v{}", env!("CARGO_PKG_VERSION"));
    println!("Type a message and press Enter. Ctrl+C or Ctrl+D to quit.\n");

    let cancel = ctrl_c_token();
    let player = speak.then(|| player(config));
    let mut session = ChatSession::new(generator);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = cancel.cancelled() => break,
        };
        let Some(line) = line else { break };
        if let Some(player) = &player {
            player.stop();
        }

        if let Some(destination) = devassist::commands::detect_navigation(&line) {
            println!("{} [{}]\n", destination.acknowledgement(), destination.route());
            continue;
        }

        let reply = tokio::select! {
            reply = session.send(&line) => reply,
            () = cancel.cancelled() => break,
        };
        println!("{}\n", reply.text);

        if let Some(player) = &player {
            let player = player.clone();
            tokio::spawn(async move { player.play(&reply.text).await });
        }
    }

    if let Some(player) = &player {
        player.stop();
    }
    Ok(())
}

async fn run_listen(config: &AssistantConfig, generator: Arc<ResponseGenerator>) -> anyhow::Result<()> {
    let mut session = VoiceSession::from_config(config, generator, player(config));
    if let Some(greeting) = session.transcript_log().first() {
        println!("{}\n", greeting.content);
    }

    // Each stdin line replaces the live transcript, as a recognizer would.
    let (live_tx, mut live) = watch::channel(String::new());
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            live_tx.send_replace(line);
        }
    });

    let cancel = ctrl_c_token();
    loop {
        let turn = tokio::select! {
            turn = session.next_utterance(&mut live) => turn,
            () = cancel.cancelled() => break,
        };
        let Some(turn) = turn else { break };

        match turn {
            VoiceTurn::Navigated {
                destination,
                acknowledgement,
            } => println!("{acknowledgement} [{}]\n", destination.route()),
            VoiceTurn::Replied(reply) => println!("{}\n", reply.text),
            VoiceTurn::NothingHeard { message } => println!("{message}\n"),
            VoiceTurn::Ignored => {
                println!("(say \"{}\" to get my attention)\n", session.name())
            }
        }
    }

    if !cancel.is_cancelled() {
        session.wait_for_playback().await;
    }
    session.close();
    Ok(())
}
