use std::path::PathBuf;

use guardchat_llm::ProviderError;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AppError {
    #[snafu(display(
        "model file not found at {path:?}. Download the GGUF model into the 'models' directory, \
         or set MODEL_PATH / pass --model-path"
    ))]
    ModelNotFound { stage: &'static str, path: PathBuf },
    #[snafu(display("settings file not found at {path:?}"))]
    ConfigNotFound { stage: &'static str, path: PathBuf },
    #[snafu(display("failed to create engine client on `{stage}`, {source}"))]
    CreateProvider {
        stage: &'static str,
        source: ProviderError,
    },
    #[snafu(display("failed to list engine models on `{stage}`, {source}"))]
    FetchModels {
        stage: &'static str,
        source: ProviderError,
    },
    #[snafu(display("failed to read input on `{stage}`: {source}"))]
    ReadInput {
        stage: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("failed to write to the terminal on `{stage}`: {source}"))]
    Render {
        stage: &'static str,
        source: std::io::Error,
    },
}

pub type AppResult<T> = Result<T, AppError>;
