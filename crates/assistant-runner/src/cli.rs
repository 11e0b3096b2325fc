use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerMode {
    Tools,
    Assistant,
}

impl RunnerMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tools => "tools",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CliOptions {
    pub mode: RunnerMode,
    pub prompt: String,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
    #[error("missing value for argument: {0}")]
    MissingValue(String),
    #[error("invalid --mode value: {0}")]
    InvalidMode(String),
    #[error("--prompt is required")]
    MissingPrompt,
    #[error("help requested")]
    HelpRequested,
}

impl CliOptions {
    pub fn parse<I>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut mode = RunnerMode::Tools;
        let mut prompt = None;

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => return Err(CliError::HelpRequested),
                "--mode" => {
                    let value = iter.next().ok_or(CliError::MissingValue(arg.clone()))?;
                    mode = parse_mode(&value)?;
                }
                "--prompt" => {
                    let value = iter.next().ok_or(CliError::MissingValue(arg.clone()))?;
                    prompt = Some(value);
                }
                unknown => return Err(CliError::UnknownArgument(unknown.to_string())),
            }
        }

        let prompt = prompt
            .map(|prompt| prompt.trim().to_string())
            .filter(|prompt| !prompt.is_empty())
            .ok_or(CliError::MissingPrompt)?;

        Ok(Self { mode, prompt })
    }
}

fn parse_mode(value: &str) -> Result<RunnerMode, CliError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "tools" => Ok(RunnerMode::Tools),
        "assistant" => Ok(RunnerMode::Assistant),
        _ => Err(CliError::InvalidMode(value.to_string())),
    }
}
