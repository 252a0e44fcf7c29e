//! Turning a captured buffer into output lines.

/// Line separator produced by a remote shell on a terminal.
pub const LINE_ENDING: &str = "\r\n";

/// What the first line of a captured buffer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstLine {
    /// The echoed command line.
    Echo,
    /// The rest of the line an intermediate pattern matched on.
    Remainder,
    /// Real output: the intermediate match ended at a line break.
    Output,
}

impl FirstLine {
    /// Classify the buffer left after an intermediate pattern matched
    /// `matched`.
    pub fn after_match(matched: &[u8]) -> Self {
        if matched.ends_with(b"\n") {
            FirstLine::Output
        } else {
            FirstLine::Remainder
        }
    }
}

/// Split the output captured before a prompt into lines.
///
/// Unless `first` is [`FirstLine::Output`], the first line is not output
/// and is dropped. Leading whitespace only counts when there is an echo to
/// strip.
pub fn parse_lines(before: &[u8], first: FirstLine) -> Vec<String> {
    let text = String::from_utf8_lossy(before);
    let text = match first {
        FirstLine::Echo => text.trim(),
        FirstLine::Remainder | FirstLine::Output => text.trim_end(),
    };
    let skip = match first {
        FirstLine::Output if text.is_empty() => return Vec::new(),
        FirstLine::Output => 0,
        FirstLine::Echo | FirstLine::Remainder => 1,
    };
    text.split(LINE_ENDING)
        .skip(skip)
        .map(str::to_string)
        .collect()
}
