use anyhow::{Context, Result};
use logos::Logos;
use nu_ansi_term::{Color, Style};
use plume_syntax::token::TokenKind;
use reedline::{
    EditCommand, Emacs, FileBackedHistory, KeyCode, KeyModifiers, PromptEditMode,
    PromptHistorySearch, Reedline, ReedlineEvent, StyledText, ValidationResult,
};

use std::borrow::Cow;
use std::fs;

pub fn editor() -> Result<Reedline> {
    let mut keybindings = reedline::default_emacs_keybindings();
    keybindings.add_binding(
        KeyModifiers::ALT,
        KeyCode::Enter,
        ReedlineEvent::Edit(vec![EditCommand::InsertNewline]),
    );

    let data_dir = dirs::data_dir().context("could not find data directory")?;
    let history_dir = data_dir.join("plume");
    fs::create_dir_all(&history_dir)
        .with_context(|| format!("could not create directory: {}", history_dir.display()))?;
    let history_path = history_dir.join("history.txt");
    let history = Box::new(
        FileBackedHistory::with_file(10000, history_path.clone())
            .with_context(|| format!("could not open history file: {}", history_path.display()))?,
    );

    let editor = Reedline::create()
        .with_edit_mode(Box::new(Emacs::new(keybindings)))
        .with_highlighter(Box::new(Highlighter))
        .with_history(history)
        .with_validator(Box::new(Validator));
    Ok(editor)
}

// Colors follow base16-google-dark, using the high-intensity variant of each.
const DEFAULT: Color = Color::LightGray;
const COMMENT: Color = Color::DarkGray;

fn color(kind: TokenKind) -> Color {
    match kind {
        TokenKind::Accept
        | TokenKind::And
        | TokenKind::Change
        | TokenKind::Create
        | TokenKind::Define
        | TokenKind::Equals
        | TokenKind::If
        | TokenKind::Not
        | TokenKind::Or
        | TokenKind::Otherwise
        | TokenKind::Repeat
        | TokenKind::Return
        | TokenKind::Times
        | TokenKind::Unequals
        | TokenKind::While
        | TokenKind::With => Color::LightPurple,
        TokenKind::Empty | TokenKind::False | TokenKind::Number | TokenKind::True => {
            Color::LightCyan
        }
        TokenKind::Identifier => Color::LightRed,
        TokenKind::Text => Color::LightGreen,
        _ => DEFAULT,
    }
}

/// Colors an entry by its tokens. Comments and whitespace are skipped by the
/// lexer, so they are filled in from the gaps between tokens.
struct Highlighter;

impl Highlighter {
    fn push_skipped(output: &mut StyledText, text: &str) {
        match text.find("//") {
            Some(idx) => {
                output.push((Style::new().fg(DEFAULT), text[..idx].to_string()));
                output.push((Style::new().fg(COMMENT), text[idx..].to_string()));
            }
            None => output.push((Style::new().fg(DEFAULT), text.to_string())),
        }
    }
}

impl reedline::Highlighter for Highlighter {
    fn highlight(&self, line: &str, _: usize) -> StyledText {
        let mut output = StyledText::new();
        let mut curr_end = 0;
        for (kind, span) in TokenKind::lexer(line).spanned() {
            if span.start > curr_end {
                Self::push_skipped(&mut output, &line[curr_end..span.start]);
            }
            output.push((Style::new().fg(color(kind)), line[span.clone()].to_string()));
            curr_end = span.end;
        }
        if curr_end < line.len() {
            Self::push_skipped(&mut output, &line[curr_end..]);
        }
        output
    }
}

struct Validator;

impl reedline::Validator for Validator {
    fn validate(&self, line: &str) -> ValidationResult {
        if plume_syntax::is_complete(line) {
            ValidationResult::Complete
        } else {
            ValidationResult::Incomplete
        }
    }
}

pub struct Prompt;

impl reedline::Prompt for Prompt {
    fn render_prompt_left(&self) -> Cow<str> {
        Cow::Borrowed(">>> ")
    }

    fn render_prompt_right(&self) -> Cow<str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _: PromptEditMode) -> Cow<str> {
        Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(&self, _: PromptHistorySearch) -> Cow<str> {
        Cow::Borrowed("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use reedline::Highlighter as _;

    #[test]
    fn highlight_keeps_every_character() {
        let line = "create x = \"a\" // note\n  display(x)";
        let output = Highlighter.highlight(line, 0);
        let text = output.buffer.iter().map(|(_, text)| text.as_str()).collect::<String>();
        assert_eq!(text, line);
    }
}
