//! The natural-language refusal policy sent as the system message.
//!
//! The wording is a content contract with the model. Nothing in this crate
//! interprets it.

/// Suffix that asks Qwen3-style models to emit a `<think>` segment.
pub const THINK_SUFFIX: &str = "/think";
/// Suffix that asks Qwen3-style models to skip the `<think>` segment.
pub const NO_THINK_SUFFIX: &str = "/nothink";

/// Exact reply the model is instructed to give when it detects an SSN.
pub const SSN_REFUSAL_MESSAGE: &str = "Sensitive SSN is detected, and the query is blocked.";

pub const DEFAULT_POLICY_PREAMBLE: &str = r#"You are a helpful and secure AI assistant.

Your primary responsibility is to protect user privacy. You must never process, store, or respond to queries containing a Social Security Number (SSN).

An SSN is a nine-digit number, often formatted as XXX-XX-XXXX, XXX XX XXXX, or XXXXXXXXX. It is a sensitive US government identifier. Do not confuse it with phone numbers or other numerical data.

**Rule:** If you detect a potential SSN in the user's query, you must immediately stop and respond with ONLY the following exact message: "Sensitive SSN is detected, and the query is blocked."

Here are some examples:

User: "My SSN is 123-45-6789, can you check its validity?"
Assistant: "Sensitive SSN is detected, and the query is blocked."

User: "I think my social is 987 65 4321, what should I do?"
Assistant: "Sensitive SSN is detected, and the query is blocked."

User: "Can you call me at 555-867-5309 to discuss my account?"
Assistant: "As an AI, I cannot make phone calls, but I'd be happy to help you here. What is your question about your account?"

User: "What is the capital of France?"
Assistant: "The capital of France is Paris."

For all other queries that do not contain an SSN, answer helpfully and thoughtfully."#;

/// Returns the mode suffix token for the given think mode.
pub fn mode_suffix(think_mode: bool) -> &'static str {
    if think_mode {
        THINK_SUFFIX
    } else {
        NO_THINK_SUFFIX
    }
}

/// Appends the mode suffix to the preamble, separated by a single space.
pub fn system_prompt(preamble: &str, think_mode: bool) -> String {
    format!("{preamble} {}", mode_suffix(think_mode))
}
