//! Terminal speech services.
//!
//! Recognition: lines typed while listening are delivered as final results.
//! Synthesis: the host's `say` (macOS) or `espeak-ng`/`espeak` command.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::{VoiceError, VoiceResult};
use crate::voice::capability::{
    RecognitionOptions, RecognitionSink, SpeechPlatform, SpeechRecognizer, SpeechServices,
    SpeechSynthesizer, SynthesisRequest, SynthesisSink,
};

/// Words per minute at rate 1.0.
const BASE_WPM: f32 = 175.0;

/// Shared handle to the console "microphone". The driver pushes typed lines
/// through it; they reach the adapter only while a listening session is open.
#[derive(Debug, Clone, Default)]
pub struct ConsoleMicrophone {
    sink: Arc<Mutex<Option<RecognitionSink>>>,
}

impl ConsoleMicrophone {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a typed line as a final result. Returns false when not listening.
    pub fn hear(&self, line: &str) -> bool {
        let guard = match self.sink.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match guard.as_ref() {
            Some(sink) => sink.final_result(line),
            None => false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.sink.lock().map(|g| g.is_some()).unwrap_or(false)
    }

    fn set(&self, sink: Option<RecognitionSink>) {
        match self.sink.lock() {
            Ok(mut guard) => *guard = sink,
            Err(poisoned) => *poisoned.into_inner() = sink,
        }
    }
}

pub struct ConsoleRecognizer {
    microphone: ConsoleMicrophone,
}

impl ConsoleRecognizer {
    pub fn new(microphone: ConsoleMicrophone) -> Self {
        Self { microphone }
    }
}

impl SpeechRecognizer for ConsoleRecognizer {
    fn start(&mut self, options: &RecognitionOptions, sink: RecognitionSink) -> VoiceResult<()> {
        debug!(
            language = %options.language,
            generation = sink.generation(),
            "console recognizer open"
        );
        self.microphone.set(Some(sink));
        Ok(())
    }

    fn stop(&mut self) {
        self.microphone.set(None);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechCommand {
    Say,
    Espeak,
}

/// A text-to-speech command found on the host, with the voices it offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedCommand {
    pub program: PathBuf,
    pub kind: SpeechCommand,
    pub voices: Vec<String>,
}

impl DetectedCommand {
    /// Locate a speech command on PATH. Blocks while `say` lists its voices,
    /// so call it before the event loop starts.
    pub fn detect() -> Option<Self> {
        let candidates = [
            ("say", SpeechCommand::Say),
            ("espeak-ng", SpeechCommand::Espeak),
            ("espeak", SpeechCommand::Espeak),
        ];
        let (program, kind) = candidates
            .iter()
            .find_map(|(name, kind)| which::which(name).ok().map(|path| (path, *kind)))?;

        let voices = match kind {
            SpeechCommand::Say => list_say_voices(&program),
            SpeechCommand::Espeak => Vec::new(),
        };
        info!(program = %program.display(), voices = voices.len(), "speech synthesizer found");

        Some(Self {
            program,
            kind,
            voices,
        })
    }
}

/// Speaks by spawning a text-to-speech command per request.
pub struct CommandSynthesizer {
    command: DetectedCommand,
    stop: Option<oneshot::Sender<()>>,
}

impl CommandSynthesizer {
    pub fn new(command: DetectedCommand) -> Self {
        Self {
            command,
            stop: None,
        }
    }

    fn arguments(&self, request: &SynthesisRequest) -> Vec<String> {
        let wpm = (BASE_WPM * request.rate).round().max(80.0) as u32;
        let mut args = Vec::new();
        match self.command.kind {
            SpeechCommand::Say => {
                args.push("-r".to_string());
                args.push(wpm.to_string());
                if let Some(voice) = &request.voice {
                    args.push("-v".to_string());
                    args.push(voice.clone());
                }
                // say has no pitch/volume flags; embedded commands carry them.
                args.push(format!(
                    "[[volm {:.2}]] [[pbas {:.0}]] {}",
                    request.volume.clamp(0.0, 1.0),
                    (request.pitch * 50.0).clamp(0.0, 127.0),
                    request.text
                ));
            }
            SpeechCommand::Espeak => {
                let voice = request
                    .voice
                    .clone()
                    .unwrap_or_else(|| request.language.to_lowercase());
                args.extend([
                    "-s".to_string(),
                    wpm.to_string(),
                    "-p".to_string(),
                    format!("{:.0}", (request.pitch * 50.0).clamp(0.0, 99.0)),
                    "-a".to_string(),
                    format!("{:.0}", (request.volume * 100.0).clamp(0.0, 200.0)),
                    "-v".to_string(),
                    voice,
                    request.text.clone(),
                ]);
            }
        }
        args
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn voices(&self) -> Vec<String> {
        self.command.voices.clone()
    }

    fn speak(&mut self, request: SynthesisRequest, sink: SynthesisSink) -> VoiceResult<()> {
        self.cancel();

        let program = &self.command.program;
        let mut child = Command::new(program)
            .args(self.arguments(&request))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                VoiceError::Platform(format!("failed to spawn {}: {}", program.display(), e))
            })?;

        let (stop_tx, mut stop_rx) = oneshot::channel();
        self.stop = Some(stop_tx);
        let id = request.id;

        tokio::spawn(async move {
            sink.started();
            tokio::select! {
                status = child.wait() => match status {
                    Ok(status) if status.success() => {
                        sink.finished();
                    }
                    Ok(status) => {
                        sink.failed(format!("speech command exited with {status}"));
                    }
                    Err(e) => {
                        sink.failed(e.to_string());
                    }
                },
                _ = &mut stop_rx => {
                    debug!(request = id, "speech cancelled");
                    if let Err(e) = child.kill().await {
                        warn!("failed to stop speech command: {}", e);
                    }
                }
            }
        });

        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

/// Parse `say -v ?` output: "Samantha            en_US    # Hello, my name is Samantha."
fn list_say_voices(program: &Path) -> Vec<String> {
    let output = match std::process::Command::new(program).args(["-v", "?"]).output() {
        Ok(output) if output.status.success() => output,
        _ => return Vec::new(),
    };
    parse_say_voices(&String::from_utf8_lossy(&output.stdout))
}

fn parse_say_voices(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| {
            let name = line.split("  ").next()?.trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

/// Console-backed speech platform.
///
/// The synthesizer command is detected once, at construction; `probe` only
/// hands out fresh services.
pub struct ConsolePlatform {
    microphone: ConsoleMicrophone,
    command: Option<DetectedCommand>,
}

impl ConsolePlatform {
    pub fn new(microphone: ConsoleMicrophone) -> Self {
        Self::with_command(microphone, DetectedCommand::detect())
    }

    pub fn with_command(microphone: ConsoleMicrophone, command: Option<DetectedCommand>) -> Self {
        Self {
            microphone,
            command,
        }
    }
}

impl SpeechPlatform for ConsolePlatform {
    fn probe(&self) -> SpeechServices {
        let recognizer: Box<dyn SpeechRecognizer> =
            Box::new(ConsoleRecognizer::new(self.microphone.clone()));
        match self.command.clone() {
            Some(command) => {
                SpeechServices::new(recognizer, Box::new(CommandSynthesizer::new(command)))
            }
            None => SpeechServices {
                recognizer: Some(recognizer),
                synthesizer: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_say_voices() {
        let listing = "Alex                en_US    # Most people recognize me by my voice.\n\
                       Bad News            en_US    # The light you see at the end of the tunnel\n\
                       Samantha            en_US    # Hello, my name is Samantha.\n";
        assert_eq!(parse_say_voices(listing), vec!["Alex", "Bad News", "Samantha"]);
    }

    #[test]
    fn test_microphone_closed_until_started() {
        let mic = ConsoleMicrophone::new();
        assert!(!mic.hear("hello"));
        assert!(!mic.is_open());

        let mut recognizer = ConsoleRecognizer::new(mic.clone());
        recognizer.stop();
        assert!(!mic.is_open());
    }

    #[test]
    fn test_espeak_arguments() {
        let synth = CommandSynthesizer::new(DetectedCommand {
            program: PathBuf::from("espeak"),
            kind: SpeechCommand::Espeak,
            voices: Vec::new(),
        });
        let request = SynthesisRequest {
            id: 1,
            text: "breathe".to_string(),
            rate: 0.8,
            pitch: 1.1,
            volume: 0.9,
            language: "en-US".to_string(),
            voice: None,
        };
        let args = synth.arguments(&request);
        assert_eq!(args, vec!["-s", "140", "-p", "55", "-a", "90", "-v", "en-us", "breathe"]);
    }

    #[test]
    fn test_probe_reuses_detected_command() {
        let command = DetectedCommand {
            program: PathBuf::from("/usr/bin/say"),
            kind: SpeechCommand::Say,
            voices: vec!["Alex".to_string(), "Samantha".to_string()],
        };
        let platform = ConsolePlatform::with_command(ConsoleMicrophone::new(), Some(command));

        for _ in 0..2 {
            let services = platform.probe();
            assert!(services.is_supported());
            let voices = services.synthesizer.as_ref().map(|s| s.voices()).unwrap();
            assert_eq!(voices, vec!["Alex", "Samantha"]);
        }
    }

    #[test]
    fn test_probe_without_command_is_unsupported() {
        let platform = ConsolePlatform::with_command(ConsoleMicrophone::new(), None);
        let services = platform.probe();
        assert!(services.recognizer.is_some());
        assert!(!services.is_supported());
    }
}
