//! Line-oriented console dialogue

use std::io::{self, BufRead, Write};
use log::{debug, warn};

use crate::helpers::duration::parse_duration;
use crate::queue::{Confirmation, RetryPrompt};

/// Result of reading one answer to a confirmation question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Proceed,
    Abort,
    Invalid,
}

/// Classify a confirmation answer: Enter proceeds, `e` exits
pub fn classify_answer(line: &str) -> Answer {
    match line.trim() {
        "" => Answer::Proceed,
        "e" | "E" => Answer::Abort,
        _ => Answer::Invalid,
    }
}

/// Console bound to an input and an output stream
pub struct Console<R, W> {
    input: R,
    out: W,
}

impl Console<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Console::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, out: W) -> Self {
        Self { input, out }
    }

    /// Print a line of user-facing output
    pub fn say(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{}", text)
    }

    /// Ask a question and read the answer; `None` on end of input
    pub fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.out, "{}", question)?;
        self.out.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            debug!("End of input");
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Ask until the answer is Enter or `e`. End of input aborts.
    pub fn confirm(&mut self, question: &str) -> io::Result<Confirmation> {
        loop {
            let line = match self.ask(question)? {
                Some(line) => line,
                None => return Ok(Confirmation::Abort),
            };
            match classify_answer(&line) {
                Answer::Proceed => return Ok(Confirmation::Proceed),
                Answer::Abort => return Ok(Confirmation::Abort),
                Answer::Invalid => self.say("Invalid input. Press Enter to continue or 'e' to exit.")?,
            }
        }
    }

    /// Ask for a menu choice in `min..=max`; `None` on end of input
    pub fn choose(&mut self, question: &str, min: usize, max: usize) -> io::Result<Option<usize>> {
        loop {
            let line = match self.ask(question)? {
                Some(line) => line,
                None => return Ok(None),
            };
            match line.trim().parse::<usize>() {
                Ok(choice) if (min..=max).contains(&choice) => return Ok(Some(choice)),
                _ => self.say(&format!("Please enter a number from {} to {}.", min, max))?,
            }
        }
    }

    /// Ask for an `hh:mm` offset until it parses; `None` on end of input
    pub fn offset(&mut self) -> io::Result<Option<u64>> {
        loop {
            let line = match self.ask("How far from now should it play? (hh:mm): ")? {
                Some(line) => line,
                None => return Ok(None),
            };
            match parse_duration(&line) {
                Ok(ms) => return Ok(Some(ms)),
                Err(e) => self.say(&format!("Invalid time: {}", e))?,
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn into_output(self) -> W {
        self.out
    }
}

impl<R: BufRead, W: Write> RetryPrompt for Console<R, W> {
    fn confirm_retry(&mut self, attempt: usize) -> Confirmation {
        let question = format!(
            "Nothing is playing (attempt {}). Start playback and press Enter to retry, or 'e' to exit: ",
            attempt
        );
        self.confirm(&question).unwrap_or_else(|e| {
            warn!("Failed to read answer: {}", e);
            Confirmation::Abort
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    pub(crate) fn console(input: &str) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
        Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    pub(crate) fn output(console: Console<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(console.into_output()).unwrap()
    }

    #[test]
    fn test_classify_answer() {
        assert_eq!(classify_answer(""), Answer::Proceed);
        assert_eq!(classify_answer("  "), Answer::Proceed);
        assert_eq!(classify_answer("e"), Answer::Abort);
        assert_eq!(classify_answer("E"), Answer::Abort);
        assert_eq!(classify_answer("exit"), Answer::Invalid);
        assert_eq!(classify_answer("y"), Answer::Invalid);
    }

    #[test]
    fn test_confirm_loops_on_invalid_input() {
        let mut c = console("yes\nmaybe\n\n");
        assert_eq!(c.confirm("Go? ").unwrap(), Confirmation::Proceed);
        assert_eq!(output(c).matches("Invalid input").count(), 2);
    }

    #[test]
    fn test_confirm_aborts_on_eof() {
        let mut c = console("x\n");
        assert_eq!(c.confirm("Go? ").unwrap(), Confirmation::Abort);
    }

    #[test]
    fn test_choose_rejects_out_of_range() {
        let mut c = console("7\nabc\n2\n");
        assert_eq!(c.choose("Pick: ", 1, 3).unwrap(), Some(2));
        assert_eq!(output(c).matches("from 1 to 3").count(), 2);
    }

    #[test]
    fn test_offset_reprompts() {
        let mut c = console("5\n1:xx\n0:05\n");
        assert_eq!(c.offset().unwrap(), Some(300_000));
        assert_eq!(output(c).matches("Invalid time").count(), 2);
    }

    #[test]
    fn test_retry_prompt_on_console() {
        let mut c = console("\ne\n");
        assert_eq!(c.confirm_retry(1), Confirmation::Proceed);
        assert_eq!(c.confirm_retry(2), Confirmation::Abort);
        assert!(output(c).contains("attempt 2"));
    }

    #[test]
    fn test_ask_strips_line_endings() {
        let mut c = console("Heroes\r\n");
        assert_eq!(c.ask("Title: ").unwrap().as_deref(), Some("Heroes"));
        assert_eq!(c.ask("Title: ").unwrap(), None);
    }
}
