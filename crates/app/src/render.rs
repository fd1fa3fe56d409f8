use std::io::{self, Write};

use guardchat_chat::{Transcript, Turn, TurnStatus};

pub const BANNER: &str = "Ask me anything, but not anything about SSN!";
const USER_PROMPT: &str = "you> ";
const ASSISTANT_PROMPT: &str = "assistant> ";

/// Line-oriented renderer that redraws the in-flight answer from snapshots.
///
/// Snapshots only ever extend the last answer, so a redraw prints the new
/// suffix instead of repainting the whole conversation.
pub struct TerminalRenderer<W: Write> {
    out: W,
    rendered_len: usize,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            rendered_len: 0,
        }
    }

    pub fn banner(&mut self, model_id: &str, think_mode: bool) -> io::Result<()> {
        writeln!(self.out, "{BANNER}")?;
        let mode = if think_mode { "on" } else { "off" };
        writeln!(self.out, "model: {model_id} | think mode: {mode}")?;
        writeln!(
            self.out,
            "Type a message and press Enter. /clear resets the chat, /exit quits, Ctrl-C stops an answer."
        )?;
        self.out.flush()
    }

    pub fn prompt(&mut self) -> io::Result<()> {
        write!(self.out, "\n{USER_PROMPT}")?;
        self.out.flush()
    }

    pub fn begin_answer(&mut self) -> io::Result<()> {
        self.rendered_len = 0;
        write!(self.out, "{ASSISTANT_PROMPT}")?;
        self.out.flush()
    }

    /// Draws whatever part of the last answer is not on screen yet.
    pub fn render(&mut self, transcript: &Transcript) -> io::Result<()> {
        let Some(turn) = transcript.last() else {
            return Ok(());
        };
        let text = turn.assistant_text.as_str();

        match text.get(self.rendered_len..) {
            Some(suffix) => write!(self.out, "{suffix}")?,
            None => {
                // Not a prefix extension; repaint the answer on a fresh line.
                write!(self.out, "\n{ASSISTANT_PROMPT}{text}")?;
            }
        }
        self.rendered_len = text.len();
        self.out.flush()
    }

    pub fn end_answer(&mut self, turn: Option<&Turn>) -> io::Result<()> {
        match turn.map(|turn| &turn.status) {
            Some(TurnStatus::Aborted) => writeln!(self.out, " [stopped]")?,
            Some(TurnStatus::Failed(message)) => writeln!(self.out, "\n[error: {message}]")?,
            Some(TurnStatus::Done | TurnStatus::Streaming) | None => writeln!(self.out)?,
        }
        self.rendered_len = 0;
        self.out.flush()
    }

    pub fn notice(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "[{message}]")?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
