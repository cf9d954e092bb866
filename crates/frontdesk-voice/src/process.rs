//! A [`SpeechEngine`] backed by external programs.
//!
//! Synthesis runs the configured synthesizer (`espeak-ng` by default) with
//! the text as its last argument and treats process exit as the end of the
//! utterance. Recognition runs `recognizer_command` and takes the trimmed
//! stdout of a successful exit as the recognized utterance. A recognizer that
//! fails may print a Web Speech error code (`no-speech`, `not-allowed`,
//! `network`) as the first line of stdout.
//!
//! Cancelling or stopping kills the child process.

use crate::config::SpeechConfig;
use crate::engine::{EngineEvent, EngineEventKind, EngineEventSink, SessionId, SpeechEngine};
use crate::error::{RecognitionErrorKind, SynthesisErrorKind, VoiceError};
use frontdesk_types::SpeechCapabilities;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// espeak-ng's default speaking rate in words per minute.
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

pub struct ProcessSpeechEngine {
    config: SpeechConfig,
    sink: Arc<dyn EngineEventSink>,
    capabilities: SpeechCapabilities,
    speak_cancel: Option<oneshot::Sender<()>>,
    listen_cancel: Option<oneshot::Sender<()>>,
}

impl ProcessSpeechEngine {
    /// Creates the engine and probes for the configured programs.
    pub fn new(config: SpeechConfig, sink: Arc<dyn EngineEventSink>) -> Self {
        let speech = program_available(&config.synthesizer);
        if !speech {
            warn!(
                synthesizer = %config.synthesizer,
                "speech synthesizer not found, replies will be text-only"
            );
        }
        let recognition = config
            .recognizer_command
            .first()
            .map(|program| program_available(program))
            .unwrap_or(false);

        Self {
            config,
            sink,
            capabilities: SpeechCapabilities {
                speech,
                recognition,
            },
            speak_cancel: None,
            listen_cancel: None,
        }
    }

    /// Arguments for the synthesizer, mapping rate/pitch/volume onto
    /// espeak-ng's `-s` (words per minute), `-p` (0-99) and `-a` (0-200).
    pub fn synthesizer_args(&self, text: &str) -> Vec<String> {
        let words_per_minute = (BASE_WORDS_PER_MINUTE * self.config.rate)
            .round()
            .clamp(80.0, 450.0) as u32;
        let pitch = (self.config.pitch * 50.0).round().clamp(0.0, 99.0) as u32;
        let amplitude = (self.config.volume * 100.0).round().clamp(0.0, 200.0) as u32;

        vec![
            "-v".to_string(),
            self.config.voice_name(),
            "-s".to_string(),
            words_per_minute.to_string(),
            "-p".to_string(),
            pitch.to_string(),
            "-a".to_string(),
            amplitude.to_string(),
            "--".to_string(),
            text.to_string(),
        ]
    }
}

impl SpeechEngine for ProcessSpeechEngine {
    fn capabilities(&self) -> SpeechCapabilities {
        self.capabilities
    }

    fn speak(&mut self, session: SessionId, text: &str) -> Result<(), VoiceError> {
        self.cancel_speak();

        let mut child = Command::new(&self.config.synthesizer)
            .args(self.synthesizer_args(text))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                VoiceError::Tts(format!(
                    "Failed to spawn {}: {}",
                    self.config.synthesizer, e
                ))
            })?;

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        self.speak_cancel = Some(cancel_tx);
        let sink = Arc::clone(&self.sink);

        tokio::spawn(async move {
            sink.emit(EngineEvent::new(session, EngineEventKind::SpeakStarted));
            let kind = tokio::select! {
                status = child.wait() => match status {
                    Ok(status) if status.success() => EngineEventKind::SpeakEnded,
                    Ok(status) => EngineEventKind::SpeakFailed {
                        kind: SynthesisErrorKind::Other,
                        message: format!("synthesizer exited with {}", status),
                    },
                    Err(e) => EngineEventKind::SpeakFailed {
                        kind: SynthesisErrorKind::Other,
                        message: format!("failed to wait for synthesizer: {}", e),
                    },
                },
                // Fires on an explicit cancel and when the sender is replaced.
                _ = cancel_rx => {
                    if let Err(e) = child.kill().await {
                        debug!(%session, error = %e, "synthesizer already exited");
                    }
                    EngineEventKind::SpeakFailed {
                        kind: SynthesisErrorKind::Canceled,
                        message: "utterance canceled".to_string(),
                    }
                }
            };
            sink.emit(EngineEvent::new(session, kind));
        });

        Ok(())
    }

    fn cancel_speak(&mut self) {
        if let Some(cancel) = self.speak_cancel.take() {
            let _ = cancel.send(());
        }
    }

    fn listen(&mut self, session: SessionId) -> Result<(), VoiceError> {
        self.stop_listen();

        let (program, args) = self
            .config
            .recognizer_command
            .split_first()
            .ok_or(VoiceError::Unsupported("speech recognition"))?;

        let child = Command::new(program)
            .args(args)
            .env("FRONTDESK_LOCALE", &self.config.locale)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VoiceError::Stt(format!("Failed to spawn {}: {}", program, e)))?;

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        self.listen_cancel = Some(cancel_tx);
        let sink = Arc::clone(&self.sink);
        let timeout = self.config.listen_timeout();

        tokio::spawn(async move {
            sink.emit(EngineEvent::new(session, EngineEventKind::ListenStarted));

            // Dropping the wait future on stop kills the child (kill_on_drop).
            let outcome = tokio::select! {
                output = tokio::time::timeout(timeout, child.wait_with_output()) => Some(output),
                _ = cancel_rx => None,
            };

            let terminal = match outcome {
                None => None,
                Some(Err(_)) => Some(EngineEventKind::ListenFailed {
                    kind: RecognitionErrorKind::NoSpeech,
                    message: format!("no speech within {} seconds", timeout.as_secs()),
                }),
                Some(Ok(Err(e))) => Some(EngineEventKind::ListenFailed {
                    kind: RecognitionErrorKind::Other,
                    message: format!("failed to read recognizer output: {}", e),
                }),
                Some(Ok(Ok(output))) => {
                    let stdout = String::from_utf8_lossy(&output.stdout);
                    if output.status.success() {
                        Some(EngineEventKind::Recognized(stdout.trim().to_string()))
                    } else {
                        let code = stdout.lines().next().unwrap_or_default();
                        Some(EngineEventKind::ListenFailed {
                            kind: RecognitionErrorKind::from_code(code),
                            message: format!("recognizer exited with {}", output.status),
                        })
                    }
                }
            };

            if let Some(kind) = terminal {
                sink.emit(EngineEvent::new(session, kind));
            }
            sink.emit(EngineEvent::new(session, EngineEventKind::ListenEnded));
        });

        Ok(())
    }

    fn stop_listen(&mut self) {
        if let Some(cancel) = self.listen_cancel.take() {
            let _ = cancel.send(());
        }
    }

    fn name(&self) -> String {
        format!("{} ({})", self.config.synthesizer, self.config.voice_name())
    }
}

/// True when `program` is an existing path or can be found on `PATH`.
fn program_available(program: &str) -> bool {
    if program.trim().is_empty() {
        return false;
    }
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}
