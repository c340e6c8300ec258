//! Text-recognition engines.
//!
//! The real engine is an external OCR program kept alive as a sidecar process,
//! since loading its models takes seconds. It reads one PNG path per line on
//! stdin and answers each with one JSON array on stdout:
//!
//! ```text
//! [{"box": [[0,0],[108,0],[108,30],[0,30]], "text": "普通模式", "score": 0.95}]
//! ```

use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use log::{info, warn};
use serde::Deserialize;

use crate::types::{Capture, TextFragment};

/// `(image) -> detections`, in image-local pixels.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &Capture) -> Result<Vec<TextFragment>>;
}

/// Recognizer that never sees anything (dry runs without an OCR program).
pub struct NullRecognizer;

impl TextRecognizer for NullRecognizer {
    fn recognize(&self, _image: &Capture) -> Result<Vec<TextFragment>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct WireFragment {
    #[serde(rename = "box")]
    quad: [[f32; 2]; 4],
    text: String,
    score: f32,
}

/// Parse one response line. `null` and `[]` both mean "no text".
pub(crate) fn parse_response(line: &str) -> Result<Vec<TextFragment>> {
    let wire: Option<Vec<WireFragment>> =
        serde_json::from_str(line.trim()).context("malformed OCR response")?;
    Ok(wire
        .unwrap_or_default()
        .into_iter()
        .map(|w| TextFragment {
            quad: w.quad.map(|[x, y]| (x, y)),
            text: w.text,
            confidence: w.score.clamp(0.0, 1.0),
        })
        .collect())
}

struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    replies: Receiver<io::Result<String>>,
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        self.child.kill().ok();
        self.child.wait().ok();
    }
}

/// Forward stdout lines to a channel so a silent child cannot block the caller.
/// The thread exits when the child closes its output.
fn spawn_reader(stdout: ChildStdout) -> Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut reader = BufReader::new(stdout);
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(Ok(line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tx.send(Err(e)).ok();
                    break;
                }
            }
        }
    });
    rx
}

/// Long-lived OCR child process, respawned after any protocol failure or
/// an answer that takes longer than `timeout`.
pub struct SidecarRecognizer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    scratch: PathBuf,
    sidecar: Mutex<Option<Sidecar>>,
}

impl SidecarRecognizer {
    /// Spawn the OCR program now so model loading happens before the first query.
    pub fn spawn(program: &str, args: &[String], timeout: Duration) -> Result<Self> {
        let recognizer = Self {
            program: program.to_string(),
            args: args.to_vec(),
            timeout,
            scratch: std::env::temp_dir().join(format!("ranger-ocr-{}.png", std::process::id())),
            sidecar: Mutex::new(None),
        };
        let sidecar = recognizer.start()?;
        *recognizer.sidecar.lock().unwrap_or_else(|e| e.into_inner()) = Some(sidecar);
        Ok(recognizer)
    }

    fn start(&self) -> Result<Sidecar> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start OCR program {:?}", self.program))?;
        let stdin = child.stdin.take().ok_or_else(|| anyhow!("OCR stdin unavailable"))?;
        let stdout = child.stdout.take().ok_or_else(|| anyhow!("OCR stdout unavailable"))?;
        info!(target: "ocr", "started OCR sidecar {} (pid {})", self.program, child.id());
        Ok(Sidecar { child, stdin, replies: spawn_reader(stdout) })
    }

    fn query(&self, sidecar: &mut Sidecar, path: &str) -> Result<Vec<TextFragment>> {
        writeln!(sidecar.stdin, "{}", path)?;
        sidecar.stdin.flush()?;
        match sidecar.replies.recv_timeout(self.timeout) {
            Ok(line) => parse_response(&line?),
            Err(RecvTimeoutError::Timeout) => bail!("OCR sidecar gave no answer within {:?}", self.timeout),
            Err(RecvTimeoutError::Disconnected) => bail!("OCR sidecar closed its output"),
        }
    }
}

impl TextRecognizer for SidecarRecognizer {
    fn recognize(&self, image: &Capture) -> Result<Vec<TextFragment>> {
        // The scratch file is shared, so it is written under the lock.
        let mut guard = self.sidecar.lock().unwrap_or_else(|e| e.into_inner());
        image
            .save(&self.scratch)
            .with_context(|| format!("failed to write {}", self.scratch.display()))?;
        let path = self.scratch.to_string_lossy().into_owned();

        if guard.is_none() {
            *guard = Some(self.start()?);
        }
        let Some(sidecar) = guard.as_mut() else {
            bail!("OCR sidecar unavailable");
        };
        match self.query(sidecar, &path) {
            Ok(fragments) => Ok(fragments),
            Err(e) => {
                warn!(target: "ocr", "sidecar failed, restarting on next query: {}", e);
                *guard = None;
                Err(e)
            }
        }
    }
}

impl Drop for SidecarRecognizer {
    fn drop(&mut self) {
        std::fs::remove_file(&self.scratch).ok();
    }
}
