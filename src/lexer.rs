//! Lexical analysis (word splitting) for the shell's command lines.
//!
//! The lexer understands single quotes, double quotes and backslash escapes and
//! nothing else: operators such as `>` are ordinary characters at this stage and
//! are picked apart later by the parser.

use tracing::trace;

/// Quoting state carried between characters.
///
/// At most one of the two quote flags is set at any time: a quote character of
/// the other kind is literal while a quote is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct QuoteState {
    in_double_quote: bool,
    in_single_quote: bool,
    escape_next: bool,
}

impl QuoteState {
    fn quoted(&self) -> bool {
        self.in_double_quote || self.in_single_quote
    }
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: QuoteState,
    buffer: String,
    out: Vec<String>,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: QuoteState::default(),
            buffer: String::new(),
            out: Vec::new(),
        }
    }

    /// Runs the machine over the whole input and returns the finished words.
    ///
    /// Unterminated quotes and a dangling escape are not errors: whatever was
    /// accumulated is flushed as the last word.
    fn make_tokens(mut self) -> Vec<String> {
        while let Some(ch) = self.read_char() {
            self.step(ch);
        }
        self.flush();
        self.out
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn step(&mut self, ch: char) {
        if self.state.escape_next {
            self.buffer.push(ch);
            self.state.escape_next = false;
            return;
        }

        match ch {
            '\\' => self.handle_backslash(),
            '"' if !self.state.in_single_quote => {
                self.state.in_double_quote = !self.state.in_double_quote;
            }
            '\'' if !self.state.in_double_quote => {
                self.state.in_single_quote = !self.state.in_single_quote;
            }
            ' ' if !self.state.quoted() => self.flush(),
            c => self.buffer.push(c),
        }
    }

    fn handle_backslash(&mut self) {
        if self.state.in_single_quote {
            self.buffer.push('\\');
        } else if self.state.in_double_quote {
            // Inside double quotes only a few characters can be escaped.
            match self.peek_char() {
                Some('\\' | '$' | '"' | '\n') => self.state.escape_next = true,
                _ => self.buffer.push('\\'),
            }
        } else {
            self.state.escape_next = true;
        }
    }

    fn flush(&mut self) {
        if !self.buffer.is_empty() {
            self.out.push(std::mem::take(&mut self.buffer));
        }
    }
}

/// Splits a command line into words, resolving quotes and escapes.
///
/// Words are separated by unquoted, unescaped spaces. This never fails.
pub fn split_into_tokens(line: &str) -> Vec<String> {
    let tokens = LexingFSM::new(line).make_tokens();
    trace!(?tokens, "split line into tokens");
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(line: &str) -> Vec<String> {
        split_into_tokens(line)
    }

    #[test]
    fn test_plain_words_split_on_spaces() {
        assert_eq!(toks("echo hello   world"), vec!["echo", "hello", "world"]);
        assert_eq!(toks("   "), Vec::<String>::new());
        assert_eq!(toks(""), Vec::<String>::new());
    }

    #[test]
    fn test_single_quotes_keep_spaces() {
        assert_eq!(toks("'a b' c"), vec!["a b", "c"]);
        assert_eq!(toks("echo 'hello    world'"), vec!["echo", "hello    world"]);
    }

    #[test]
    fn test_adjacent_quoted_parts_join_into_one_word() {
        assert_eq!(toks("'foo''bar'"), vec!["foobar"]);
        assert_eq!(toks("a\"b c\"d"), vec!["ab cd"]);
    }

    #[test]
    fn test_escaped_quote_inside_double_quotes() {
        assert_eq!(toks("\"a\\\"b\""), vec!["a\"b"]);
    }

    #[test]
    fn test_double_quotes_escape_only_special_chars() {
        assert_eq!(toks("\"a\\\\b\""), vec!["a\\b"]);
        assert_eq!(toks("\"\\$HOME\""), vec!["$HOME"]);
        assert_eq!(toks("\"a\\nb\""), vec!["a\\nb"]);
        assert_eq!(toks("\"x\\\ny\""), vec!["x\ny"]);
    }

    #[test]
    fn test_backslash_is_literal_in_single_quotes() {
        assert_eq!(toks("'a\\b'"), vec!["a\\b"]);
        assert_eq!(toks("'a\\'"), vec!["a\\"]);
    }

    #[test]
    fn test_escaped_space_outside_quotes() {
        assert_eq!(toks("a\\ b"), vec!["a b"]);
        assert_eq!(toks("echo \\'x\\'"), vec!["echo", "'x'"]);
        assert_eq!(toks("a\\\\b"), vec!["a\\b"]);
    }

    #[test]
    fn test_other_quote_kind_is_literal() {
        assert_eq!(toks("\"it's\""), vec!["it's"]);
        assert_eq!(toks("'say \"hi\"'"), vec!["say \"hi\""]);
    }

    #[test]
    fn test_unterminated_quote_flushes_rest_of_line() {
        assert_eq!(toks("echo 'abc def"), vec!["echo", "abc def"]);
        assert_eq!(toks("echo \"x"), vec!["echo", "x"]);
    }

    #[test]
    fn test_trailing_backslash_is_dropped() {
        assert_eq!(toks("abc\\"), vec!["abc"]);
    }

    #[test]
    fn test_empty_quotes_produce_no_word() {
        assert_eq!(toks("echo '' \"\""), vec!["echo"]);
    }

    #[test]
    fn test_redirect_operators_are_plain_text() {
        assert_eq!(toks("echo hi>out"), vec!["echo", "hi>out"]);
        assert_eq!(toks("echo '>' x"), vec!["echo", ">", "x"]);
    }
}
