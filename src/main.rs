use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use serene::config::CompanionConfig;
use serene::kernel::event::{EngineNotice, Originator};
use serene::platform::{ConsoleMicrophone, ConsolePlatform};
use serene::session::{CompanionSession, Mode};
use serene::voice::{VoiceNotice, VoiceState};
use serene::{EngineError, TurnState};

const HELP: &str = "\
Commands:
  /voice    switch to voice chat        /text     switch to text chat
  /listen   start listening (voice)     /stop     stop listening
  /hush     stop speaking               /breathe  guided breathing
  /affirm   an affirmation              /quit     leave";

const UNAVAILABLE: &str = "Voice features are unavailable here. Please use text chat instead.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; the conversation owns stdout.
    let subscriber = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("serene=info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config = match config_path() {
        Some(path) => CompanionConfig::load(&path)
            .with_context(|| format!("loading config from {path}"))?,
        None => CompanionConfig::default(),
    };

    let microphone = ConsoleMicrophone::new();
    let platform = ConsolePlatform::new(microphone.clone());
    let mut session = CompanionSession::new(config, Box::new(platform))
        .context("invalid response configuration")?;
    let persona = session.persona_name().to_string();

    let mut engine_notices = session.engine().subscribe();
    let mut voice_notices: Option<broadcast::Receiver<VoiceNotice>> = None;

    for utterance in session.engine().current_transcript() {
        println!("{persona}: {}", utterance.text);
    }
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else { break };
                let line = line.trim();
                match line {
                    "/quit" => break,
                    "/help" => println!("{HELP}"),
                    "/voice" => {
                        if !session.enter_voice_mode() {
                            println!("{UNAVAILABLE}");
                        }
                        voice_notices = session.voice().map(|v| v.subscribe());
                        if session.voice().is_some_and(|v| !v.is_unsupported()) {
                            if let Some(voice) = session.voice().and_then(|v| v.selected_voice()) {
                                println!("(voice: {voice})");
                            }
                            println!(
                                "Voice chat with {persona}. /listen, then type what you would say."
                            );
                        }
                    }
                    "/text" => {
                        session.enter_text_mode();
                        voice_notices = None;
                        println!("Text chat with {persona}.");
                    }
                    "/listen" | "/stop" | "/hush" | "/breathe" | "/affirm" => {
                        let result = session.voice_mut().and_then(|voice| match line {
                            "/listen" => voice.start_listening(),
                            "/stop" => voice.stop_listening(),
                            "/hush" => voice.stop_speaking(),
                            "/breathe" => voice.speak_guided_breathing(),
                            _ => voice.speak_affirmation(),
                        });
                        if let Err(e) = result {
                            println!("({e})");
                        }
                    }
                    text if session.mode() == Mode::Voice => {
                        if !microphone.hear(text) {
                            println!("(not listening; type /listen first)");
                        }
                    }
                    text => match session.engine_mut().submit_user_text(text) {
                        Ok(_) | Err(EngineError::EmptyInput) => {}
                        Err(EngineError::TurnInProgress) => {
                            println!("({persona} is still writing...)")
                        }
                        Err(e) => println!("({e})"),
                    },
                }
            }
            Some(event) = session.next_event() => {
                session.handle(event);
            }
            Ok(notice) = engine_notices.recv() => render_engine(&persona, notice),
            Some(notice) = next_voice_notice(&mut voice_notices) => render_voice(&persona, notice),
        }
    }

    session.shutdown();
    let telemetry =
        serde_json::to_string_pretty(&session.telemetry()).context("encoding telemetry")?;
    eprintln!("{telemetry}");
    Ok(())
}

fn config_path() -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next();
        }
    }
    None
}

async fn next_voice_notice(
    rx: &mut Option<broadcast::Receiver<VoiceNotice>>,
) -> Option<VoiceNotice> {
    match rx {
        Some(rx) => rx.recv().await.ok(),
        None => std::future::pending().await,
    }
}

fn render_engine(persona: &str, notice: EngineNotice) {
    match notice {
        EngineNotice::UtteranceAppended(u) if u.originator == Originator::Assistant => {
            println!("{persona}: {}", u.text);
        }
        EngineNotice::TurnStateChanged { to: TurnState::AwaitingAssistant { .. }, .. } => {
            println!("{persona} is typing...");
        }
        _ => {}
    }
}

fn render_voice(persona: &str, notice: VoiceNotice) {
    match notice {
        VoiceNotice::StateChanged {
            to: VoiceState::Listening,
            ..
        } => println!("Listening... (/stop to stop)"),
        VoiceNotice::StateChanged {
            from: VoiceState::Speaking,
            to: VoiceState::Idle,
        } => println!("(done speaking)"),
        VoiceNotice::FinalTranscript(text) => println!("You said: {text}"),
        VoiceNotice::Speaking { text, .. } => println!("{persona} (speaking): {text}"),
        VoiceNotice::Fault(e) => println!("({e}. Please try again.)"),
        VoiceNotice::Unsupported => println!("{UNAVAILABLE}"),
        _ => {}
    }
}
