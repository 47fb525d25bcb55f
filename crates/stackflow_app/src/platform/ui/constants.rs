/// Log lines shown under the job list.
pub const LOG_TAIL: usize = 12;
/// Jobs shown in the job list.
pub const JOB_ROWS: usize = 10;
/// Longest input shown in a job row before it is cut.
pub const INPUT_WIDTH: usize = 60;
pub const RULE: &str = "--------------------------------------------------------------------------";
pub const TITLE: &str = "StackFlow Simulator";
pub const CREDENTIAL_BANNER: &str = "[!] Missing API_KEY: submission is disabled";
pub const PROMPT: &str = "Enter a URL or a topic to research > ";
/// Clears the screen and homes the cursor.
pub const CLEAR: &str = "\x1b[2J\x1b[H";
