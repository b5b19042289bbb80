use std::sync::Arc;

use clap::builder::BoolishValueParser;
use clap::Parser;
use itertools::Itertools;
use miette::{IntoDiagnostic, Result};
use supportchat::{
    Config, Message, MessageId, MessageKind, Orchestrator, RatingType, Session, SupportApi,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Talk to a support space from the terminal.
///
/// Type a message and press enter to send it. Commands:
/// `/good`, `/bad` rate the last answer; `/option N` copies option N into the
/// input (press enter on an empty line to send it); `/open N` opens the
/// related link of tile N; `/quit` leaves the chat.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Base URL of the support API
    #[arg(long, env = "SUPPORTCHAT_API_BASE_URL")]
    api_base_url: String,

    /// Space identifier
    #[arg(long, env = "SUPPORTCHAT_IDENTIFIER")]
    identifier: String,

    /// Device fingerprint used to obtain the access token
    #[arg(long, env = "SUPPORTCHAT_FINGERPRINT")]
    fingerprint: Option<String>,

    /// Submit a "none" rating when an answer is left unrated
    #[arg(
        long,
        env = "SUPPORTCHAT_DEFAULT_RATING_ON_DISCARD",
        value_parser = BoolishValueParser::new()
    )]
    default_rating_on_discard: bool,
}

impl Cli {
    fn config(self) -> Config {
        Config {
            api_base_url: self.api_base_url,
            identifier: self.identifier,
            fingerprint: self
                .fingerprint
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            send_default_rating_on_discard: self.default_rating_on_discard,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("supportchat=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Cli::parse().config();
    let session = Session::bootstrap(&config).await?;

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(session.client),
        session.chat_setting,
        config.orchestrator(),
    ));

    let renderer = tokio::spawn(render(orchestrator.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut draft: Option<String> = None;

    while let Some(line) = lines.next_line().await.into_diagnostic()? {
        let line = line.trim();

        match line.split_once(' ').unwrap_or((line, "")) {
            ("/quit", _) => break,
            ("/good", _) => {
                orchestrator.rate(RatingType::Good).await;
            }
            ("/bad", _) => {
                orchestrator.rate(RatingType::Bad).await;
            }
            ("/option", n) => match nth_option(&orchestrator.messages(), n) {
                Some(option) => {
                    let text = orchestrator.select_option(&option);
                    println!("  input> {text}");
                    draft = Some(text);
                }
                None => println!("  no such option"),
            },
            ("/open", n) => match nth_related_url(&orchestrator.messages(), n) {
                Some(url) => {
                    println!("  opening {url}");
                    orchestrator.track_url(&url).await;
                }
                None => println!("  no such link"),
            },
            ("", _) => {
                if let Some(text) = draft.take() {
                    orchestrator.send_message(&text).await;
                }
            }
            _ => {
                draft = None;
                if !orchestrator.send_message(line).await {
                    println!("  (not sent)");
                }
            }
        }
    }

    orchestrator.close().await;
    renderer.abort();

    Ok(())
}

async fn render<A: SupportApi + 'static>(orchestrator: Arc<Orchestrator<A>>) {
    let mut revisions = orchestrator.subscribe();
    let mut printed = MessageId(0);

    loop {
        let seen = printed;
        for message in orchestrator.messages().iter().filter(|m| m.id > seen) {
            println!("{}", format_message(message));
            printed = message.id;
        }

        if revisions.changed().await.is_err() {
            break;
        }
    }
}

fn format_message(message: &Message) -> String {
    match &message.kind {
        MessageKind::User => format!("you> {}", message.content),
        MessageKind::Company if message.content.is_empty() => "bot> ...".to_string(),
        MessageKind::Company => format!("bot> {}", message.content),
        MessageKind::Options { options, .. } => {
            let listed = options
                .iter()
                .enumerate()
                .map(|(i, o)| format!("  [{}] {}", i + 1, o.simple_content))
                .join("\n");
            format!("bot> {}\n{listed}", message.content)
        }
        MessageKind::FaqTiles { tiles } => tiles
            .iter()
            .enumerate()
            .map(|(i, tile)| {
                let link = tile
                    .related_link
                    .as_deref()
                    .map(|l| format!("\n      {l}"))
                    .unwrap_or_default();
                format!("  <{}> {}\n      {}{link}", i + 1, tile.question, tile.answer)
            })
            .join("\n"),
        MessageKind::Separator => format!("----- {} -----", message.content),
        MessageKind::Rating { .. } => format!("bot> {}\n  (/good or /bad)", message.content),
    }
}

fn nth_option(messages: &[Message], n: &str) -> Option<String> {
    let index = n.trim().parse::<usize>().ok()?.checked_sub(1)?;

    messages.iter().rev().find_map(|m| match &m.kind {
        MessageKind::Options { options, .. } => options.get(index).map(|o| o.content.clone()),
        _ => None,
    })
}

fn nth_related_url(messages: &[Message], n: &str) -> Option<String> {
    let index = n.trim().parse::<usize>().ok()?.checked_sub(1)?;

    messages.iter().rev().find_map(|m| match &m.kind {
        MessageKind::FaqTiles { tiles } => tiles.get(index)?.related_url.clone(),
        _ => None,
    })
}
