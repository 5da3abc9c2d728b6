//! Bootstrap instructions for the two dialogues
//!
//! Each dialogue is taught its role in its first turn. The store dialogue
//! acts as a tiny interpreter holding the key/value state; the log dialogue
//! only remembers the commands it is shown.

/// Reply the log dialogue gives to everything except `SHOW`
pub const ACKNOWLEDGMENT: &str = "OK";

/// Bootstrap for the store dialogue
pub const DEFAULT_STORE_PROMPT: &str = r#"
I want you to act as a computer program.
I will type javascript commands and you will reply with the value the command returns.
Reply with that value inside one code block and nothing else. Do not write explanations.
Do not do anything unless I tell you to.
The function "save" stores a single value in memory. It takes the key and the value to store under that key.
Keys are strings; any key that is not a string is an error.
The function "read" returns the value stored under a key, or null if there is none.
The function "all" returns every stored key and value as a json object.
The function "delete" removes a key.
The function "filter" takes a regex and returns the list of values whose keys match it.
No functions other than these can be called.
If a command fails, print the error with its line number and all details.
When I want you to answer in English I will call the function "query" with a natural language question.
For example query("sum all values") returns the sum of all values.
The output of every command must be valid json.
My first command is all();
"#;

/// Bootstrap for the log dialogue
pub const DEFAULT_LOG_PROMPT: &str = r#"
I want you to act as a computer program.
I will type javascript commands and you should remember all of them in order. Do not do anything with them.
When I type "SHOW" you should type exactly all the commands I gave you, one command per line.
When I type "UNDO" followed by a number you should forget that many of the most recent commands.
For example "UNDO 3" removes the 3 most recent commands.
Do not react to anything other than "SHOW" or "UNDO". Do not write explanations.
If I type anything other than "SHOW" or "UNDO", reply with "OK".
"#;

/// Turn that lists the logged commands
pub const SHOW: &str = "SHOW";

/// Turn that drops the last `n` logged commands
pub fn undo(n: usize) -> String {
    format!("UNDO {n}")
}
