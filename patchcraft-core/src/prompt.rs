//! # Prompt construction
//!
//! The model is given a fixed instructional preamble describing the Pure Data
//! patch format (with one worked example), followed by the operator's goal.
//! The preamble asks the model to close every patch with an end-of-patch
//! marker, which is also the API stop sequence.

use crate::provider::ChatMessage;

/// Example patch shown to the model; an FM synth with labelled number boxes.
const EXAMPLE_PATCH: &str = "\
#N canvas 92 117 450 300 12;
#X obj 218 172 *~;
#X floatatom 218 87 5 0 0 0 - - - 0;
#X floatatom 148 132 5 0 0 0 - - - 0;
#X obj 148 202 +~;
#X floatatom 236 142 4 0 0 0 - - - 0;
#X text 123 89 carrier;
#X text 122 107 frequency;
#X text 203 63 frequency;
#X text 204 46 modulation;
#X obj 148 248 osc~;
#X text 275 154 index;
#X text 277 135 modulation;
#X obj 218 112 osc~;
#X obj 149 283 dac~;
#X connect 0 0 3 1;
#X connect 1 0 12 0;
#X connect 2 0 3 0;
#X connect 3 0 9 0;
#X connect 4 0 0 1;
#X connect 9 0 13 0;
#X connect 12 0 0 0;";

/// Builds the preamble and the per-goal prompt
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    eof_marker: String,
}

impl PromptBuilder {
    pub fn new(eof_marker: impl Into<String>) -> Self {
        Self {
            eof_marker: eof_marker.into(),
        }
    }

    pub fn eof_marker(&self) -> &str {
        &self.eof_marker
    }

    /// The fixed instructional preamble
    pub fn system_prompt(&self) -> String {
        format!(
            "You are an assistant made for the purposes of helping the user with Pure Data. \
             Do not respond with anything that is not Pure Data messages. \
             Do not provide explanations. Do not provide examples. \
             Do not create connections between objects that do not exist. \
             Append '{eof}' to the end of the patcher.\n\n\
             Example:\n\n\
             user: create an FM synth\n\
             assistant:\n\
             {example}\n\
             {eof}\n",
            eof = self.eof_marker,
            example = EXAMPLE_PATCH,
        )
    }

    /// The goal text with the end-of-patch reminder appended
    pub fn user_prompt(&self, goal: &str) -> String {
        format!(
            "{} Append an '{}' to the end of the patcher.",
            goal.trim(),
            self.eof_marker
        )
    }

    /// Preamble and goal as a single prompt string
    pub fn build(&self, goal: &str) -> String {
        format!("{}\n{}", self.system_prompt(), self.user_prompt(goal))
    }

    /// Preamble and goal as a chat conversation
    pub fn messages(&self, goal: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system_prompt()),
            ChatMessage::user(self.user_prompt(goal)),
        ]
    }
}

/// Reduce a completion to the lines the patching environment should receive.
///
/// - everything from `eof_marker` onward is dropped
/// - the top-level `#N canvas` header, if it is the first non-blank line, is
///   dropped (the environment owns the canvas)
/// - a leading `#X ` record prefix is stripped
///
/// Later `#N canvas` lines open subpatches and are kept so that each
/// `restore` still has its canvas. Blank lines and line endings are
/// preserved; splitting is the script's job.
pub fn extract_patch_body(completion: &str, eof_marker: &str) -> String {
    let body = match eof_marker {
        "" => completion,
        marker => completion.find(marker).map_or(completion, |at| &completion[..at]),
    };

    let mut out = String::with_capacity(body.len());
    let mut seen_content = false;
    for line in body.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            out.push_str(line);
            continue;
        }
        let first = !seen_content;
        seen_content = true;
        if first && trimmed.starts_with("#N canvas") {
            continue;
        }
        out.push_str(trimmed.strip_prefix("#X ").unwrap_or(line));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Role;

    #[test]
    fn test_system_prompt_mentions_marker_and_example() {
        let builder = PromptBuilder::new("###");
        let system = builder.system_prompt();
        assert!(system.contains("Append '###' to the end of the patcher."));
        assert!(system.contains("#X obj 149 283 dac~;"));
        assert!(system.trim_end().ends_with("###"));
    }

    #[test]
    fn test_build_combines_preamble_and_goal() {
        let builder = PromptBuilder::new("###");
        let prompt = builder.build("  Create a noise generator\n");
        assert!(prompt.starts_with("You are an assistant"));
        assert!(prompt.ends_with("Create a noise generator Append an '###' to the end of the patcher."));
    }

    #[test]
    fn test_messages_roles() {
        let messages = PromptBuilder::new("###").messages("Create a low pass filter");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.starts_with("Create a low pass filter"));
    }

    #[test]
    fn test_extract_patch_body() {
        let completion = "#N canvas 0 0 450 300 12;\n#X obj 10 10 osc~ 440;\n\n#X obj 10 40 dac~;\n#X connect 0 0 1 0;\n###\ntrailing chatter";
        assert_eq!(
            extract_patch_body(completion, "###"),
            "obj 10 10 osc~ 440;\n\nobj 10 40 dac~;\nconnect 0 0 1 0;\n"
        );
    }

    #[test]
    fn test_extract_keeps_subpatch_canvas() {
        let completion = "#N canvas 0 0 450 300 12;\n#X obj 10 10 osc~;\n#N canvas 0 0 450 300 sub 0;\n#X obj 20 20 inlet;\n#X restore 10 40 pd sub;\n";
        assert_eq!(
            extract_patch_body(completion, "###"),
            "obj 10 10 osc~;\n#N canvas 0 0 450 300 sub 0;\nobj 20 20 inlet;\nrestore 10 40 pd sub;\n"
        );
    }

    #[test]
    fn test_extract_header_after_blank_lines() {
        assert_eq!(
            extract_patch_body("\n#N canvas 0 0 450 300 12;\n#X obj 1 1 dac~;\n", "###"),
            "\nobj 1 1 dac~;\n"
        );
    }

    #[test]
    fn test_extract_leaves_plain_commands_alone() {
        assert_eq!(
            extract_patch_body("create obj\nconnect 0 0\n", "###"),
            "create obj\nconnect 0 0\n"
        );
    }

    #[test]
    fn test_extract_without_marker_keeps_truncated_tail() {
        assert_eq!(
            extract_patch_body("#X obj 1 1 osc~;\n#X conn", "###"),
            "obj 1 1 osc~;\nconn"
        );
        assert_eq!(extract_patch_body("a\n###", ""), "a\n###");
    }
}
