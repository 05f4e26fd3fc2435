//! UniSenac Protocol - Line protocol shared by server and client
//!
//! The wire format is plain UTF-8 text. The client sends one command per
//! `\n`-terminated line; the server answers with free-form text and then
//! re-issues the prompt sentinel [`PROMPT`]. The goodbye reply to a quit
//! synonym is the only reply not followed by a prompt.

pub mod command;
pub mod reply;

pub use command::{is_quit, Command, QUIT_SYNONYMS};

/// Prompt re-issued by the server after every reply except the goodbye.
///
/// Clients treat a trailing fragment ending in this text as a "ready"
/// sentinel, not as a message.
pub const PROMPT: &str = "Digite um comando: ";

/// Returns true if an unterminated fragment from the server is the prompt
/// sentinel rather than displayable content.
///
/// This matches the prompt text literally; a server speaking another
/// language would defeat it.
pub fn is_prompt_fragment(fragment: &str) -> bool {
    fragment.ends_with(PROMPT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_text() {
        assert_eq!(PROMPT, "Digite um comando: ");
    }

    #[test]
    fn test_prompt_fragment() {
        assert!(is_prompt_fragment("Digite um comando: "));
        assert!(is_prompt_fragment("\nDigite um comando: "));
        assert!(!is_prompt_fragment("Digite um comando:"));
        assert!(!is_prompt_fragment("Latência: 42ms"));
        assert!(!is_prompt_fragment(""));
    }
}
