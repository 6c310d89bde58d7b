use thiserror::Error;

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("{file}:{line}: {message}")]
    Parse { file: String, line: usize, message: String },
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid range map: {0}")]
    RangeMap(String),
}

impl MappingError {
    pub fn parse(file: &str, line: usize, message: impl Into<String>) -> Self {
        MappingError::Parse { file: file.to_string(),
                              line,
                              message: message.into() }
    }

    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        MappingError::Io { path: path.display().to_string(),
                           source }
    }
}
